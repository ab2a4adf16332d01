//! Alsvid Adapter for IBM Quantum Direct Access
//!
//! This crate provides a [`QuantumResource`] implementation for backends
//! reached through a provisioned Direct Access instance: a single-tenant
//! API deployed close to the QPU, with job input and output exchanged
//! through an S3-compatible object store via presigned URLs.
//!
//! # Authentication
//!
//! Requests carry an IAM bearer token (exchanged from an API key and
//! refreshed before expiry) plus the Service-CRN of the provisioned
//! instance.
//!
//! # Environment Variables
//!
//! All keys are prefixed with the resource name, `{name}_`.
//!
//! Required:
//! - `{name}_QRMI_IBM_DA_IAM_ENDPOINT` — IAM identity service URL
//! - `{name}_QRMI_IBM_DA_IAM_APIKEY` — IAM API key
//! - `{name}_QRMI_IBM_DA_SERVICE_CRN` — CRN of the Direct Access instance
//!
//! Optional:
//! - `{name}_QRMI_IBM_DA_ENDPOINT` — instance URL (default: `http://localhost:8080`)
//!
//! Object store, optional as a group (all five or none; without them
//! tasks cannot be started):
//! - `{name}_QRMI_IBM_DA_S3_ENDPOINT`
//! - `{name}_QRMI_IBM_DA_AWS_ACCESS_KEY_ID`
//! - `{name}_QRMI_IBM_DA_AWS_SECRET_ACCESS_KEY`
//! - `{name}_QRMI_IBM_DA_S3_REGION`
//! - `{name}_QRMI_IBM_DA_S3_BUCKET`
//!
//! Task wall time comes from `{name}_QRMI_JOB_TIMEOUT_SECONDS`, published
//! into the job environment by the scheduler plugin.
//!
//! # Example
//!
//! ```ignore
//! use alsvid_adapter_direct_access::DirectAccessResource;
//! use alsvid_qrmi::QuantumResource;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut resource = DirectAccessResource::from_env("heron1")?;
//!
//!     if resource.is_accessible().await? {
//!         let token = resource.acquire().await?;
//!         println!("acquired: {token}");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
mod error;
mod resource;
mod s3;

pub use api::{BackendResponse, DaClient, DaJobStatus, JobData, JobsResponse, ProgramId, DEFAULT_ENDPOINT};
pub use error::{DaError, DaResult};
pub use resource::DirectAccessResource;
pub use s3::ResultStore;

// Re-export common types
pub use alsvid_qrmi::QuantumResource;
