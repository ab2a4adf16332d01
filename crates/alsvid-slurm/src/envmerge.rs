//! Per-resource environment merging.
//!
//! Two sources feed a resource's effective environment, in precedence
//! order:
//!
//! 1. **Job-supplied values** — variables the user exported at submission
//!    under the resource's `{name}_QRMI_` namespace. Propagated verbatim
//!    and never overwritten.
//! 2. **Catalog defaults** — the definition's `environment` map, published
//!    as `{name}_{key}` with keep-if-exists semantics in both the process
//!    scope and the job scope.
//!
//! Catalog keys carry the `QRMI_` prefix themselves, so an override and
//! its default share one variable name and precedence reduces to
//! write-order plus keep-if-exists.

use tracing::{debug, warn};

use crate::config::ResourceDefinition;
use crate::host::{EnvSink, JobContext};
use crate::keybuf::EnvKeyBuf;

/// Merge one resource's environment into the process and job scopes.
///
/// Never fails; a rejected job-scope write is logged and the remaining
/// keys are still applied.
pub fn apply_resource_env(
    name: &str,
    definition: &ResourceDefinition,
    keys: &mut EnvKeyBuf,
    host: &mut dyn JobContext,
    process_env: &mut dyn EnvSink,
) {
    let job_env = host.job_env();
    let prefix = keys.build(name, "QRMI_");
    for (key, value) in &job_env {
        if key.starts_with(prefix) {
            process_env.set(key, value, true);
            debug!("Propagated job-supplied {}", key);
        }
    }

    for (key, value) in &definition.environment {
        let merged = keys.build(name, key);
        if let Err(e) = host.setenv(merged, value, false) {
            warn!("Job environment write failed for {}: {}", merged, e);
        }
        process_env.set(merged, value, false);
    }
}
