//! Slurm-side QPU lifecycle management.
//!
//! This crate turns a `--qpu` request on a Slurm job into leased access to
//! quantum resources before the payload runs, publishes connection metadata
//! into the job environment, propagates the wall-time budget, and guarantees
//! release on exit. The scheduler boundary is the [`JobContext`] trait; the
//! SPANK shim in the plugin binary is a thin adapter over it.
//!
//! # Hook mapping
//!
//! | SPANK entry point     | Lifecycle method                     |
//! |-----------------------|--------------------------------------|
//! | `slurm_spank_init`    | [`QpuLifecycle::init`]               |
//! | `slurm_spank_init_post_opt` | [`QpuLifecycle::init_post_opt`] |
//! | `slurm_spank_task_init` | [`QpuLifecycle::task_init`]        |
//! | `slurm_spank_exit`    | [`QpuLifecycle::exit`]               |
//!
//! # Configuration
//!
//! The plugin line in `plugstack.conf` names the resource catalog and any
//! policy overrides:
//!
//! ```text
//! required alsvid_spank.so /etc/slurm/qpu_resources.json duplicates=skip
//! ```
//!
//! # Example
//!
//! ```ignore
//! use alsvid_slurm::{builtin_registry, PluginArgs, QpuLifecycle};
//!
//! let args = PluginArgs::parse(&plugin_argv)?;
//! let mut lifecycle = QpuLifecycle::new(builtin_registry(), args)?;
//! lifecycle.init(&mut host)?;
//! ```

pub mod config;
pub mod envmerge;
pub mod error;
pub mod host;
pub mod keybuf;
pub mod lifecycle;
pub mod request;
pub mod tracker;

pub use config::{
    DuplicatePolicy, EmptyRequestPolicy, LifecyclePolicies, PluginArgs, QpuConfig,
    ResourceDefinition,
};
pub use envmerge::apply_resource_env;
pub use error::{AcquireError, SlurmError, SlurmResult};
pub use host::{
    EnvSink, HostError, HostResult, JobContext, MemoryEnv, ProcessEnv, SpankContext,
    BATCH_SCRIPT_STEP_ID,
};
pub use keybuf::EnvKeyBuf;
pub use lifecycle::{
    LifecycleState, QpuLifecycle, ACQUISITION_TOKEN_SUFFIX, JOB_QPU_RESOURCES, JOB_QPU_TYPES,
    QPU_OPTION, TIMEOUT_SECONDS_SUFFIX,
};
pub use request::ResourceRequest;
pub use tracker::{AcquiredResource, ReleaseSummary, ResourceTracker};

use alsvid_qrmi::{ResourceRegistry, ResourceType};

/// Build a registry with every vendor adapter this workspace ships.
///
/// Each factory reads its connection settings from `{name}_`-prefixed
/// environment variables, which the activation loop populates from the
/// resource catalog before acquiring.
pub fn builtin_registry() -> ResourceRegistry {
    let mut registry = ResourceRegistry::new();
    registry.register(ResourceType::DirectAccess, |name| {
        Ok(Box::new(
            alsvid_adapter_direct_access::DirectAccessResource::from_env(name)?,
        ))
    });
    registry.register(ResourceType::QiskitRuntimeService, |name| {
        Ok(Box::new(
            alsvid_adapter_runtime_service::RuntimeServiceResource::from_env(name)?,
        ))
    });
    registry.register(ResourceType::PasqalCloud, |name| {
        Ok(Box::new(alsvid_adapter_pasqal::PasqalResource::from_env(
            name,
        )?))
    });
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_covers_all_types() {
        let registry = builtin_registry();
        assert!(registry.has_type(ResourceType::DirectAccess));
        assert!(registry.has_type(ResourceType::QiskitRuntimeService));
        assert!(registry.has_type(ResourceType::PasqalCloud));
    }
}
