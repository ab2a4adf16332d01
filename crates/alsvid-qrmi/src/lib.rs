//! Alsvid Quantum Resource Management Interface
//!
//! This crate defines the uniform surface over remotely-managed quantum
//! resources ("QPUs") that are leased to batch jobs for the duration of a
//! job: accessibility probes, lease acquisition and release, and the task
//! lifecycle that client programs drive against an already-leased resource.
//!
//! # Overview
//!
//! - A common [`QuantumResource`] trait implemented by every vendor adapter
//! - [`ResourceType`] naming the supported service families
//! - Task models ([`TaskId`], [`TaskStatus`], [`Payload`], [`TaskResult`])
//!   and the device description ([`Target`])
//! - A [`ResourceRegistry`] mapping resource types to adapter factories
//!
//! # Supported resource types
//!
//! | Type | Crate | Lease token |
//! |------|-------|-------------|
//! | `direct-access` | `alsvid-adapter-direct-access` | opaque UUID (no server session) |
//! | `qiskit-runtime-service` | `alsvid-adapter-runtime-service` | session id |
//! | `pasqal-cloud` | `alsvid-adapter-pasqal` | opaque UUID (no server session) |
//!
//! # Lease lifecycle
//!
//! ```text
//!   is_accessible() ──→ acquire() ──→ task_start() ──→ task_status() ──→ task_result()
//!        (probe)         (token)                        (poll loop)
//!                           │
//!                           └──────────── release(token) at job end
//! ```
//!
//! # Example: polling a task to completion
//!
//! ```ignore
//! use alsvid_qrmi::{Payload, QuantumResource, TaskStatus};
//! use alsvid_adapter_direct_access::DirectAccessResource;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut resource = DirectAccessResource::from_env("heron1")?;
//!
//!     let payload = Payload::QiskitPrimitive {
//!         input: std::fs::read_to_string("job.json")?,
//!         program_id: "sampler".to_string(),
//!     };
//!     let task_id = resource.task_start(payload).await?;
//!
//!     let status = resource.task_wait(&task_id, std::time::Duration::from_secs(1)).await?;
//!     if status == TaskStatus::Completed {
//!         println!("{}", resource.task_result(&task_id).await?.value);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod registry;
pub mod resource;
pub mod resource_type;
pub mod task;

pub use error::{QrmiError, QrmiResult};
pub use registry::ResourceRegistry;
pub use resource::QuantumResource;
pub use resource_type::ResourceType;
pub use task::{Payload, Target, TaskId, TaskResult, TaskStatus};
