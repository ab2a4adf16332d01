//! The QPU lifecycle orchestrator.
//!
//! One [`QpuLifecycle`] instance lives for the whole plugin process and
//! carries all state between the four SPANK entry points, which share no
//! call stack:
//!
//! ```text
//!            init()            init_post_opt()              task_init()     exit()
//!   INIT ──────────→ OPTIONS_REGISTERED ──────→ RESOLVING ──┬─→ ACTIVATED ──→ RUNNING ──→ RELEASING ──→ DONE
//!                                                           │       ↑            │ ↑
//!                                                           └─→ FAILED           └─┘ (once per task)
//! ```
//!
//! **Invariants:**
//! - Acquisition runs once per job, in the remote context, for the
//!   batch-script step only.
//! - Per-resource failures are logged and skipped; only an empty tracker
//!   after the full request aborts job launch.
//! - Release is attempted for every tracked record on every path through
//!   `exit`, and a failed release never skips the rest.

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use alsvid_qrmi::ResourceRegistry;
use rustc_hash::FxHashSet;

use crate::config::{DuplicatePolicy, EmptyRequestPolicy, LifecyclePolicies, PluginArgs, QpuConfig};
use crate::envmerge::apply_resource_env;
use crate::error::{SlurmError, SlurmResult};
use crate::host::{EnvSink, JobContext, ProcessEnv, SpankContext, BATCH_SCRIPT_STEP_ID};
use crate::keybuf::EnvKeyBuf;
use crate::request::ResourceRequest;
use crate::tracker::ResourceTracker;

/// Job-submission option registered with the scheduler.
pub const QPU_OPTION: &str = "qpu";

/// Aggregate variable holding the comma-joined acquired resource names.
pub const JOB_QPU_RESOURCES: &str = "SLURM_JOB_QPU_RESOURCES";

/// Aggregate variable holding the comma-joined acquired resource types.
pub const JOB_QPU_TYPES: &str = "SLURM_JOB_QPU_TYPES";

/// Per-resource suffix for the published acquisition token.
pub const ACQUISITION_TOKEN_SUFFIX: &str = "QRMI_JOB_ACQUISITION_TOKEN";

/// Per-resource suffix for the propagated wall-time budget.
pub const TIMEOUT_SECONDS_SUFFIX: &str = "QRMI_JOB_TIMEOUT_SECONDS";

/// Where the lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing has run yet.
    Init,
    /// The `--qpu` option is registered.
    OptionsRegistered,
    /// The activation loop is processing the request.
    Resolving,
    /// At least one resource was acquired.
    Activated,
    /// The request yielded no resources; job launch was aborted.
    Failed,
    /// Tasks are running with the timeout propagated.
    Running,
    /// The release pass is underway.
    Releasing,
    /// All state is drained.
    Done,
}

impl LifecycleState {
    /// Short identifier for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Init => "init",
            LifecycleState::OptionsRegistered => "options-registered",
            LifecycleState::Resolving => "resolving",
            LifecycleState::Activated => "activated",
            LifecycleState::Failed => "failed",
            LifecycleState::Running => "running",
            LifecycleState::Releasing => "releasing",
            LifecycleState::Done => "done",
        }
    }

    /// Whether the lifecycle has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Failed | LifecycleState::Done)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide lifecycle context driven by the SPANK entry points.
pub struct QpuLifecycle {
    state: LifecycleState,
    registry: ResourceRegistry,
    policies: LifecyclePolicies,
    config_path: PathBuf,
    request: Option<String>,
    tracker: ResourceTracker,
    keys: EnvKeyBuf,
    process_env: Box<dyn EnvSink>,
    runtime: tokio::runtime::Runtime,
}

impl QpuLifecycle {
    /// Create the lifecycle context from plugin arguments.
    ///
    /// The current-thread runtime built here drives the async resource
    /// clients from the synchronous hooks.
    pub fn new(registry: ResourceRegistry, args: PluginArgs) -> SlurmResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SlurmError::Runtime(e.to_string()))?;

        Ok(Self {
            state: LifecycleState::Init,
            registry,
            policies: args.policies,
            config_path: args.config_path,
            request: None,
            tracker: ResourceTracker::new(),
            keys: EnvKeyBuf::new(),
            process_env: Box::new(ProcessEnv),
            runtime,
        })
    }

    /// Replace the process-environment sink (tests use an in-memory one).
    pub fn with_process_env(mut self, sink: impl EnvSink + 'static) -> Self {
        self.process_env = Box::new(sink);
        self
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The tracked resources.
    pub fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    /// The stored request-option string, while a job is active.
    pub fn request(&self) -> Option<&str> {
        self.request.as_deref()
    }

    /// The process-scope environment sink.
    pub fn process_env(&self) -> &dyn EnvSink {
        self.process_env.as_ref()
    }

    /// Job-option registration hook.
    pub fn init(&mut self, host: &mut dyn JobContext) -> SlurmResult<()> {
        host.register_option(QPU_OPTION, "Comma separated list of QPU resources to use.")?;
        self.state = LifecycleState::OptionsRegistered;
        debug!("Registered --{} option", QPU_OPTION);
        Ok(())
    }

    /// Post-option-processing hook: the activation loop.
    ///
    /// Acquires in the remote context for the batch-script step only, so
    /// a job with many tasks leases each resource once.
    pub fn init_post_opt(&mut self, host: &mut dyn JobContext) -> SlurmResult<()> {
        if host.context() != SpankContext::Remote {
            return Ok(());
        }
        if let Some(stepid) = host.job_stepid() {
            if stepid != BATCH_SCRIPT_STEP_ID {
                return Ok(());
            }
        }
        let Some(raw) = host.option_value(QPU_OPTION) else {
            return Ok(());
        };

        let request = ResourceRequest::parse(&raw);
        if request.is_empty() {
            return match self.policies.empty_request {
                EmptyRequestPolicy::Ignore => {
                    debug!("Empty --{} value, not a QPU job", QPU_OPTION);
                    Ok(())
                }
                EmptyRequestPolicy::Fail => {
                    self.state = LifecycleState::Failed;
                    error!("Empty --{} value with empty-request=fail", QPU_OPTION);
                    Err(SlurmError::NoResourcesAcquired)
                }
            };
        }

        self.request = Some(raw);
        self.state = LifecycleState::Resolving;

        // stale aggregates must never survive into this activation
        host.setenv(JOB_QPU_RESOURCES, "", true)?;
        host.setenv(JOB_QPU_TYPES, "", true)?;

        let config = match QpuConfig::load(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                self.state = LifecycleState::Failed;
                return Err(e);
            }
        };

        let mut seen: FxHashSet<String> = FxHashSet::default();
        for name in request.names() {
            match self.policies.duplicates {
                DuplicatePolicy::Skip if seen.contains(name) => {
                    debug!("Skipping duplicate resource '{}'", name);
                    continue;
                }
                DuplicatePolicy::Reject if seen.contains(name) => {
                    self.state = LifecycleState::Failed;
                    return Err(SlurmError::DuplicateResource(name.to_string()));
                }
                _ => {}
            }
            seen.insert(name.to_string());

            let Some(def) = config.resource(name) else {
                warn!("Unknown resource name '{}', skipping", name);
                continue;
            };

            apply_resource_env(name, def, &mut self.keys, host, self.process_env.as_mut());

            let fut = self.tracker.acquire(&self.registry, name, def.resource_type);
            match self.runtime.block_on(fut) {
                Ok(record) => {
                    if let Some(token) = record.token() {
                        let key = self.keys.build(name, ACQUISITION_TOKEN_SUFFIX);
                        if let Err(e) = host.setenv(key, token, false) {
                            warn!("Job environment write failed for {}: {}", key, e);
                        }
                        self.process_env.set(key, token, false);
                    }
                }
                Err(e) => {
                    error!("{}", e);
                }
            }
        }

        if self.tracker.is_empty() {
            self.state = LifecycleState::Failed;
            error!("No QPU resource available");
            return Err(SlurmError::NoResourcesAcquired);
        }

        let names = self
            .tracker
            .iter()
            .map(|r| r.name())
            .collect::<Vec<_>>()
            .join(",");
        let types = self
            .tracker
            .iter()
            .map(|r| r.resource_type().as_str())
            .collect::<Vec<_>>()
            .join(",");
        host.setenv(JOB_QPU_RESOURCES, &names, true)?;
        host.setenv(JOB_QPU_TYPES, &types, true)?;

        self.state = LifecycleState::Activated;
        info!(
            "Activated {}/{} QPU resources: {}",
            self.tracker.len(),
            request.len(),
            names
        );
        Ok(())
    }

    /// Pre-task-execution hook: wall-time propagation.
    ///
    /// Runs once per task and is idempotent; re-setting the same value is
    /// harmless.
    pub fn task_init(&mut self, host: &mut dyn JobContext) -> SlurmResult<()> {
        if host.context() != SpankContext::Remote {
            return Ok(());
        }
        if host.option_value(QPU_OPTION).is_none() {
            return Ok(());
        }

        let Some(minutes) = host.time_limit_minutes() else {
            error!("Job time limit lookup failed");
            return Err(SlurmError::MissingTimeLimit);
        };
        let seconds = minutes.saturating_mul(60).to_string();

        for record in self.tracker.iter() {
            let key = self.keys.build(record.name(), TIMEOUT_SECONDS_SUFFIX);
            host.setenv(key, &seconds, true)?;
        }

        if matches!(
            self.state,
            LifecycleState::Activated | LifecycleState::Running
        ) {
            self.state = LifecycleState::Running;
        }
        debug!("Propagated {}s wall-time budget", seconds);
        Ok(())
    }

    /// Job-exit hook: best-effort release and state teardown.
    ///
    /// Safe to call on jobs that never activated.
    pub fn exit(&mut self, _host: &mut dyn JobContext) -> SlurmResult<()> {
        if !self.tracker.is_empty() {
            self.state = LifecycleState::Releasing;
            let fut = self.tracker.release_all(&self.registry);
            let summary = self.runtime.block_on(fut);
            if summary.all_released() {
                info!("Released {} QPU resources", summary.released);
            } else {
                warn!(
                    "Released {} QPU resources, {} failed",
                    summary.released, summary.failed
                );
            }
        }

        self.request = None;
        self.state = LifecycleState::Done;
        Ok(())
    }
}
