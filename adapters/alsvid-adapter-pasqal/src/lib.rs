//! Alsvid Adapter for Pasqal Cloud
//!
//! This crate provides a [`QuantumResource`] implementation for Pasqal
//! neutral-atom devices reached through the Pasqal Cloud batches API.
//! A task is a Pulser sequence submitted as a batch with a single job;
//! the batch id becomes the task id.
//!
//! Pasqal Cloud has no lease concept, so acquiring the resource issues a
//! locally generated token and releasing is a no-op. Exclusivity, when
//! needed, comes from the site scheduler.
//!
//! # Environment Variables
//!
//! All keys are prefixed with the resource name, `{name}_`.
//!
//! Required:
//! - `{name}_QRMI_PASQAL_CLOUD_PROJECT_ID` — project the batches run under
//! - `{name}_QRMI_PASQAL_CLOUD_AUTH_TOKEN` — bearer token
//!
//! Optional:
//! - `{name}_QRMI_PASQAL_CLOUD_ENDPOINT` — API URL (default: `https://apis.pasqal.cloud`)
//!
//! # Example
//!
//! ```ignore
//! use alsvid_adapter_pasqal::PasqalResource;
//! use alsvid_qrmi::{Payload, QuantumResource};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut resource = PasqalResource::from_env("FRESNEL")?;
//!
//!     let task = resource
//!         .task_start(Payload::PulserSequence {
//!             sequence: std::fs::read_to_string("sequence.json")?,
//!             job_runs: 100,
//!         })
//!         .await?;
//!     println!("batch: {task}");
//!
//!     Ok(())
//! }
//! ```

pub mod api;
mod error;
mod resource;

pub use api::{Batch, BatchStatus, DEFAULT_ENDPOINT, PasqalClient};
pub use error::{PasqalError, PasqalResult};
pub use resource::PasqalResource;

// Re-export common types
pub use alsvid_qrmi::QuantumResource;
