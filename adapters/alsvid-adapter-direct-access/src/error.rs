//! Error types for the Direct Access adapter.

use thiserror::Error;

use alsvid_qrmi::QrmiError;

/// Result type for Direct Access operations.
pub type DaResult<T> = Result<T, DaError>;

/// Errors from the Direct Access service or its object storage.
#[derive(Error, Debug)]
pub enum DaError {
    /// Required configuration is missing from the environment.
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    /// A configuration value could not be parsed.
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },

    /// The IAM API key could not be exchanged for a bearer token.
    #[error("IAM token exchange failed: {0}")]
    IamTokenExchange(String),

    /// A header value was rejected (token or CRN with invalid characters).
    #[error("Invalid credential value: {0}")]
    InvalidCredential(String),

    /// The service answered with a non-success HTTP status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// No job with this id exists on the service.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// The job reached a state from which results cannot be fetched.
    #[error("Result for job {task_id} unavailable: {reason}")]
    ResultUnavailable { task_id: String, reason: String },

    /// The payload kind does not fit this service.
    #[error("Unsupported payload: {0}")]
    UnsupportedPayload(String),

    /// S3 upload/download/presign failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// HTTP transport error.
    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<DaError> for QrmiError {
    fn from(e: DaError) -> Self {
        match e {
            DaError::MissingEnv(key) => QrmiError::MissingEnv(key),
            DaError::InvalidEnv { key, value } => QrmiError::InvalidEnv { key, value },
            DaError::Api { status, message } => QrmiError::Api { status, message },
            DaError::JobNotFound(id) => QrmiError::TaskNotFound(id),
            DaError::UnsupportedPayload(msg) => QrmiError::InvalidPayload(msg),
            DaError::Storage(msg) => QrmiError::Storage(msg),
            DaError::Http(e) => QrmiError::Request(e),
            DaError::Json(e) => QrmiError::Json(e),
            other => QrmiError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DaError::MissingEnv("heron1_QRMI_IBM_DA_ENDPOINT".to_string());
        assert_eq!(
            err.to_string(),
            "Missing environment variable: heron1_QRMI_IBM_DA_ENDPOINT"
        );

        let err = DaError::Api {
            status: 409,
            message: "duplicate job id".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 409 - duplicate job id");
    }

    #[test]
    fn test_conversion_to_qrmi_error() {
        let err: QrmiError = DaError::JobNotFound("j1".to_string()).into();
        assert!(matches!(err, QrmiError::TaskNotFound(id) if id == "j1"));

        let err: QrmiError = DaError::IamTokenExchange("401".to_string()).into();
        assert!(matches!(err, QrmiError::Backend(_)));
    }
}
