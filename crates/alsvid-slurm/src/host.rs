//! The host scheduler boundary.
//!
//! Slurm drives the lifecycle through four SPANK entry points; everything
//! the lifecycle needs from the scheduler in those calls is behind
//! [`JobContext`], so the whole flow runs against [`MockJobContext`] in
//! tests without a slurmstepd. The thin C shim that exports the actual
//! `slurm_spank_*` symbols implements [`JobContext`] over the `spank_t`
//! handle and forwards each call.
//!
//! Environment writes have two scopes: the job's published environment
//! (via [`JobContext::setenv`], what `spank_setenv` does) and the current
//! process environment (via [`EnvSink`], what adapters constructed in this
//! process read). The two sinks are independent and both support
//! keep-if-exists semantics.

use thiserror::Error;

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors surfaced by the host scheduler.
#[derive(Error, Debug)]
pub enum HostError {
    /// Option registration was rejected.
    #[error("Option registration failed: {0}")]
    OptionRegistration(String),

    /// A job-environment write was rejected.
    #[error("Environment write failed for {key}: {reason}")]
    SetEnv { key: String, reason: String },
}

/// Where a hook invocation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpankContext {
    /// Submission-side client (srun).
    Local,
    /// Compute-node side (slurmstepd). The only context that acquires.
    Remote,
    /// Allocation-side client (sbatch, salloc).
    Allocator,
}

/// Step id Slurm assigns to the batch script itself.
///
/// Per-task sub-steps carry ordinary ids; acquisition runs only for this
/// sentinel so a multi-task job leases each resource once.
pub const BATCH_SCRIPT_STEP_ID: u64 = 0xfffffffb;

/// Everything the lifecycle consumes from the host scheduler.
pub trait JobContext {
    /// Which side of the scheduler this invocation runs on.
    fn context(&self) -> SpankContext;

    /// Register a job-submission option (e.g. `--qpu`).
    fn register_option(&mut self, name: &str, usage: &str) -> HostResult<()>;

    /// Value of a registered option, if the job supplied it.
    fn option_value(&self, name: &str) -> Option<String>;

    /// Job step identity, when known in this context.
    fn job_stepid(&self) -> Option<u64>;

    /// The job's submitted environment, as `(key, value)` pairs.
    fn job_env(&self) -> Vec<(String, String)>;

    /// Read one variable from the job's environment.
    fn getenv(&self, key: &str) -> Option<String>;

    /// Write one variable into the job's published environment.
    ///
    /// With `overwrite` false an existing value is kept and the call
    /// still succeeds.
    fn setenv(&mut self, key: &str, value: &str, overwrite: bool) -> HostResult<()>;

    /// Scheduled wall-time limit in minutes, when the scheduler knows it.
    fn time_limit_minutes(&self) -> Option<u64>;
}

/// Destination for process-scope environment writes.
pub trait EnvSink {
    /// Set a variable; with `overwrite` false an existing value is kept.
    fn set(&mut self, key: &str, value: &str, overwrite: bool);

    /// Read a variable back.
    fn get(&self, key: &str) -> Option<String>;
}

/// The real process environment.
pub struct ProcessEnv;

impl EnvSink for ProcessEnv {
    fn set(&mut self, key: &str, value: &str, overwrite: bool) {
        if !overwrite && std::env::var_os(key).is_some() {
            return;
        }
        // Hooks run single-threaded before the job payload starts; that is
        // the soundness condition for mutating the process environment.
        unsafe { std::env::set_var(key, value) };
    }

    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory [`EnvSink`] for tests.
#[derive(Debug, Default)]
pub struct MemoryEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MemoryEnv {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnvSink for MemoryEnv {
    fn set(&mut self, key: &str, value: &str, overwrite: bool) {
        if !overwrite && self.vars.contains_key(key) {
            return;
        }
        self.vars.insert(key.to_string(), value.to_string());
    }

    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// In-memory host for tests and development.
///
/// Builder methods shape the scenario; after the hooks ran, assertions
/// read back the published environment with [`JobContext::getenv`].
#[derive(Debug)]
pub struct MockJobContext {
    context: SpankContext,
    stepid: Option<u64>,
    time_limit_minutes: Option<u64>,
    options: std::collections::BTreeMap<String, String>,
    registered_options: Vec<String>,
    job_env: Vec<(String, String)>,
    published: std::collections::BTreeMap<String, String>,
}

impl MockJobContext {
    /// A remote-context host positioned at the batch-script step.
    pub fn remote() -> Self {
        Self {
            context: SpankContext::Remote,
            stepid: Some(BATCH_SCRIPT_STEP_ID),
            time_limit_minutes: None,
            options: std::collections::BTreeMap::new(),
            registered_options: Vec::new(),
            job_env: Vec::new(),
            published: std::collections::BTreeMap::new(),
        }
    }

    /// A local-context host (no step identity).
    pub fn local() -> Self {
        Self {
            context: SpankContext::Local,
            stepid: None,
            ..Self::remote()
        }
    }

    /// Set the job step id.
    pub fn with_stepid(mut self, stepid: u64) -> Self {
        self.stepid = Some(stepid);
        self
    }

    /// Supply a job-submission option value.
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Add a variable to the job's submitted environment.
    pub fn with_job_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.job_env.push((key.into(), value.into()));
        self
    }

    /// Set the scheduled wall-time limit.
    pub fn with_time_limit_minutes(mut self, minutes: u64) -> Self {
        self.time_limit_minutes = Some(minutes);
        self
    }

    /// Option names registered through this host.
    pub fn registered_options(&self) -> &[String] {
        &self.registered_options
    }
}

impl JobContext for MockJobContext {
    fn context(&self) -> SpankContext {
        self.context
    }

    fn register_option(&mut self, name: &str, _usage: &str) -> HostResult<()> {
        self.registered_options.push(name.to_string());
        Ok(())
    }

    fn option_value(&self, name: &str) -> Option<String> {
        self.options.get(name).cloned()
    }

    fn job_stepid(&self) -> Option<u64> {
        self.stepid
    }

    fn job_env(&self) -> Vec<(String, String)> {
        self.job_env.clone()
    }

    fn getenv(&self, key: &str) -> Option<String> {
        self.published.get(key).cloned().or_else(|| {
            self.job_env
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
    }

    fn setenv(&mut self, key: &str, value: &str, overwrite: bool) -> HostResult<()> {
        if !overwrite && self.getenv(key).is_some() {
            return Ok(());
        }
        self.published.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn time_limit_minutes(&self) -> Option<u64> {
        self.time_limit_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_keep_if_exists() {
        let mut host = MockJobContext::remote();
        host.setenv("KEY", "first", false).unwrap();
        host.setenv("KEY", "second", false).unwrap();
        assert_eq!(host.getenv("KEY").unwrap(), "first");

        host.setenv("KEY", "third", true).unwrap();
        assert_eq!(host.getenv("KEY").unwrap(), "third");
    }

    #[test]
    fn test_mock_getenv_sees_submitted_env() {
        let mut host = MockJobContext::remote().with_job_env("SUBMITTED", "yes");
        assert_eq!(host.getenv("SUBMITTED").unwrap(), "yes");

        // keep-if-exists also respects the submitted environment
        host.setenv("SUBMITTED", "no", false).unwrap();
        assert_eq!(host.getenv("SUBMITTED").unwrap(), "yes");
    }

    #[test]
    fn test_memory_env_keep_if_exists() {
        let mut env = MemoryEnv::new();
        env.set("A", "1", false);
        env.set("A", "2", false);
        assert_eq!(env.get("A").unwrap(), "1");
        env.set("A", "3", true);
        assert_eq!(env.get("A").unwrap(), "3");
    }

    #[test]
    fn test_batch_script_sentinel() {
        assert_eq!(BATCH_SCRIPT_STEP_ID, 0xfffffffb);
    }
}
