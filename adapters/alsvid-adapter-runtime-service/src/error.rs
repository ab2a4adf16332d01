//! Error types for the Qiskit Runtime Service adapter.

use alsvid_qrmi::QrmiError;
use thiserror::Error;

/// Result type for Runtime Service operations.
pub type QrsResult<T> = Result<T, QrsError>;

/// Errors from the Runtime Service REST API and its IAM token flow.
#[derive(Error, Debug)]
pub enum QrsError {
    /// A required environment variable is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    /// An environment variable is set to an unusable value.
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },

    /// IAM rejected the API key exchange.
    #[error("IAM token exchange failed: {0}")]
    IamTokenExchange(String),

    /// A credential cannot be carried in a request header.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// The service answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The service declined to open a session.
    #[error("Session not created: {0}")]
    SessionRejected(String),

    /// No job with the given id.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// The job is not in a state that has results.
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

impl From<QrsError> for QrmiError {
    fn from(e: QrsError) -> Self {
        match e {
            QrsError::MissingEnv(key) => QrmiError::MissingEnv(key),
            QrsError::InvalidEnv { key, value } => QrmiError::InvalidEnv { key, value },
            QrsError::Api { status, message } => QrmiError::Api { status, message },
            QrsError::JobNotFound(id) => QrmiError::TaskNotFound(id),
            QrsError::UnsupportedPayload(msg) => QrmiError::InvalidPayload(msg),
            QrsError::Http(e) => QrmiError::Request(e),
            QrsError::Json(e) => QrmiError::Json(e),
            other => QrmiError::Backend(other.to_string()),
        }
    }
}
