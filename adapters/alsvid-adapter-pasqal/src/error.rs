//! Error types for the Pasqal Cloud adapter.

use alsvid_qrmi::QrmiError;
use thiserror::Error;

/// Result type for Pasqal Cloud operations.
pub type PasqalResult<T> = Result<T, PasqalError>;

/// Errors from the Pasqal Cloud batches API.
#[derive(Error, Debug)]
pub enum PasqalError {
    /// A required environment variable is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    /// The auth token cannot be carried in a request header.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// The service answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// No batch with the given id.
    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    /// The batch is not in a state that has results.
    #[error("No result for task {task_id}: {reason}")]
    ResultUnavailable { task_id: String, reason: String },

    /// The payload kind cannot run on this resource.
    #[error("Unsupported payload: {0}")]
    UnsupportedPayload(String),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<PasqalError> for QrmiError {
    fn from(e: PasqalError) -> Self {
        match e {
            PasqalError::MissingEnv(key) => QrmiError::MissingEnv(key),
            PasqalError::Api { status, message } => QrmiError::Api { status, message },
            PasqalError::BatchNotFound(id) => QrmiError::TaskNotFound(id),
            PasqalError::UnsupportedPayload(msg) => QrmiError::InvalidPayload(msg),
            PasqalError::Http(e) => QrmiError::Request(e),
            PasqalError::Json(e) => QrmiError::Json(e),
            other => QrmiError::Backend(other.to_string()),
        }
    }
}
