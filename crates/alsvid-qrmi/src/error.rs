//! Error handling for the resource management interface.

use thiserror::Error;

use crate::resource_type::ResourceType;

/// Result type for resource operations.
pub type QrmiResult<T> = Result<T, QrmiError>;

/// Errors that can occur when talking to a quantum resource.
#[derive(Error, Debug)]
pub enum QrmiError {
    /// The resource rejected or failed the lease request.
    #[error("Failed to acquire '{name}': {reason}")]
    AcquisitionFailed { name: String, reason: String },

    /// Releasing a lease failed on the service side.
    #[error("Failed to release '{name}': {reason}")]
    ReleaseFailed { name: String, reason: String },

    /// No adapter is registered for the requested resource type.
    #[error("Unsupported resource type: {0}")]
    UnsupportedResourceType(ResourceType),

    /// Required configuration is missing from the environment.
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    /// A configuration value could not be parsed.
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },

    /// The service answered with a non-success HTTP status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Task not found on the service.
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// The payload does not fit the resource type.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Object storage upload/download failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Vendor-specific failure with no closer mapping.
    #[error("Backend error: {0}")]
    Backend(String),

    /// HTTP transport error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
