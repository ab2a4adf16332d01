//! Alsvid Adapter for IBM Qiskit Runtime Service
//!
//! This crate provides a [`QuantumResource`] implementation for backends
//! leased through Qiskit Runtime Service sessions. Acquiring the resource
//! opens a session and yields its id as the acquisition token; releasing
//! closes the session. Primitive jobs submitted with that token attach to
//! the session and share its priority window.
//!
//! # Authentication
//!
//! Requests carry an IAM bearer token (exchanged from an API key and
//! refreshed before expiry) plus the Service-CRN of the service instance
//! and an IBM-API-Version header.
//!
//! # Environment Variables
//!
//! All keys are prefixed with the resource name, `{name}_`.
//!
//! Required:
//! - `{name}_QRMI_IBM_QRS_IAM_ENDPOINT` — IAM identity service URL
//! - `{name}_QRMI_IBM_QRS_IAM_APIKEY` — IAM API key
//! - `{name}_QRMI_IBM_QRS_SERVICE_CRN` — CRN of the service instance
//!
//! Optional:
//! - `{name}_QRMI_IBM_QRS_ENDPOINT` — API URL (default: `https://quantum.cloud.ibm.com/api`)
//! - `{name}_QRMI_IBM_QRS_SESSION_MODE` — session mode (default: `dedicated`)
//! - `{name}_QRMI_IBM_QRS_SESSION_TTL` — session TTL in seconds (default: `28800`)
//!
//! At task submission the adapter also reads two keys published by the
//! scheduler plugin when running under an allocation:
//! - `{name}_QRMI_JOB_ACQUISITION_TOKEN` — session id to attach jobs to
//! - `{name}_QRMI_JOB_TIMEOUT_SECONDS` — job cost ceiling in seconds
//!
//! # Example
//!
//! ```ignore
//! use alsvid_adapter_runtime_service::RuntimeServiceResource;
//! use alsvid_qrmi::QuantumResource;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut resource = RuntimeServiceResource::from_env("ibm_fez")?;
//!
//!     let session = resource.acquire().await?;
//!     // ... submit primitive jobs against the session ...
//!     resource.release(&session).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
mod error;
mod resource;

pub use api::{BackendStatusResponse, DEFAULT_ENDPOINT, JobResponse, JobState, QrsClient, SessionResponse};
pub use error::{QrsError, QrsResult};
pub use resource::{DEFAULT_SESSION_MODE, DEFAULT_SESSION_TTL, RuntimeServiceResource};

// Re-export common types
pub use alsvid_qrmi::QuantumResource;
