//! End-to-end lifecycle runs against an in-memory host and stub resources.

use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use alsvid_qrmi::{
    Payload, QrmiError, QrmiResult, QuantumResource, ResourceRegistry, ResourceType, Target,
    TaskId, TaskResult, TaskStatus,
};
use alsvid_slurm::{
    JobContext, LifecycleState, MemoryEnv, MockJobContext, PluginArgs, QpuLifecycle, SlurmError,
    JOB_QPU_RESOURCES, JOB_QPU_TYPES, QPU_OPTION,
};

// ==== Stub resources ====

/// Per-name behavior switches shared by every stub the registry creates.
#[derive(Default)]
struct StubBehavior {
    inaccessible: HashSet<String>,
    broken_acquire: HashSet<String>,
    broken_release: HashSet<String>,
}

impl StubBehavior {
    fn inaccessible(mut self, name: &str) -> Self {
        self.inaccessible.insert(name.to_string());
        self
    }

    fn broken_acquire(mut self, name: &str) -> Self {
        self.broken_acquire.insert(name.to_string());
        self
    }

    fn broken_release(mut self, name: &str) -> Self {
        self.broken_release.insert(name.to_string());
        self
    }
}

struct StubResource {
    name: String,
    resource_type: ResourceType,
    accessible: bool,
    acquire_ok: bool,
    release_ok: bool,
    released: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl QuantumResource for StubResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    async fn is_accessible(&self) -> QrmiResult<bool> {
        Ok(self.accessible)
    }

    async fn acquire(&mut self) -> QrmiResult<String> {
        if self.acquire_ok {
            Ok(format!("token-{}", self.name))
        } else {
            Err(QrmiError::AcquisitionFailed {
                name: self.name.clone(),
                reason: "backend offline".to_string(),
            })
        }
    }

    async fn release(&mut self, _token: &str) -> QrmiResult<()> {
        if self.release_ok {
            self.released.lock().unwrap().push(self.name.clone());
            Ok(())
        } else {
            Err(QrmiError::ReleaseFailed {
                name: self.name.clone(),
                reason: "session delete rejected".to_string(),
            })
        }
    }

    async fn target(&self) -> QrmiResult<Target> {
        Ok(Target {
            value: "{}".to_string(),
        })
    }

    async fn task_start(&mut self, _payload: Payload) -> QrmiResult<TaskId> {
        Ok(TaskId::new("stub-task"))
    }

    async fn task_stop(&mut self, _task_id: &TaskId) -> QrmiResult<()> {
        Ok(())
    }

    async fn task_status(&self, _task_id: &TaskId) -> QrmiResult<TaskStatus> {
        Ok(TaskStatus::Completed)
    }

    async fn task_result(&self, _task_id: &TaskId) -> QrmiResult<TaskResult> {
        Ok(TaskResult {
            value: "{}".to_string(),
        })
    }
}

fn stub_registry(behavior: StubBehavior, released: &Arc<Mutex<Vec<String>>>) -> ResourceRegistry {
    let behavior = Arc::new(behavior);
    let mut registry = ResourceRegistry::new();
    for resource_type in [ResourceType::DirectAccess, ResourceType::QiskitRuntimeService] {
        let behavior = Arc::clone(&behavior);
        let released = Arc::clone(released);
        registry.register(resource_type, move |name| {
            Ok(Box::new(StubResource {
                name: name.to_string(),
                resource_type,
                accessible: !behavior.inaccessible.contains(name),
                acquire_ok: !behavior.broken_acquire.contains(name),
                release_ok: !behavior.broken_release.contains(name),
                released: Arc::clone(&released),
            }))
        });
    }
    registry
}

// ==== Catalog fixture ====

/// Writes a three-resource catalog and returns its path.
fn write_catalog(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("qpu_resources.json");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"{{
  "resources": [
    {{
      "name": "qpu1",
      "type": "direct-access",
      "environment": {{
        "QRMI_IBM_DA_ENDPOINT": "https://da.example.com"
      }}
    }},
    {{
      "name": "qpu2",
      "type": "qiskit-runtime-service",
      "environment": {{
        "QRMI_IBM_QRS_ENDPOINT": "https://qrs.example.com"
      }}
    }},
    {{
      "name": "qpu3",
      "type": "direct-access",
      "environment": {{}}
    }}
  ]
}}"#
    )
    .unwrap();
    path
}

struct Scenario {
    _dir: TempDir,
    released: Arc<Mutex<Vec<String>>>,
    lifecycle: QpuLifecycle,
}

fn scenario(behavior: StubBehavior, extra_args: &[&str]) -> Scenario {
    let dir = TempDir::new().unwrap();
    let path = write_catalog(&dir);
    let released = Arc::new(Mutex::new(Vec::new()));
    let registry = stub_registry(behavior, &released);

    let mut argv = vec![path.to_str().unwrap().to_string()];
    argv.extend(extra_args.iter().map(|s| s.to_string()));
    let args = PluginArgs::parse(&argv).unwrap();

    let lifecycle = QpuLifecycle::new(registry, args)
        .unwrap()
        .with_process_env(MemoryEnv::new());
    Scenario {
        _dir: dir,
        released,
        lifecycle,
    }
}

fn released_names(scenario: &Scenario) -> Vec<String> {
    scenario.released.lock().unwrap().clone()
}

// ==== Activation ====

#[test]
fn test_activation_publishes_aggregates_and_metadata() {
    let mut s = scenario(StubBehavior::default(), &[]);
    let mut host = MockJobContext::remote().with_option(QPU_OPTION, "qpu1,qpu2");

    s.lifecycle.init(&mut host).unwrap();
    s.lifecycle.init_post_opt(&mut host).unwrap();

    assert_eq!(s.lifecycle.state(), LifecycleState::Activated);
    assert_eq!(s.lifecycle.tracker().len(), 2);
    assert_eq!(host.getenv(JOB_QPU_RESOURCES).unwrap(), "qpu1,qpu2");
    assert_eq!(
        host.getenv(JOB_QPU_TYPES).unwrap(),
        "direct-access,qiskit-runtime-service"
    );

    // catalog defaults land in both scopes
    assert_eq!(
        host.getenv("qpu1_QRMI_IBM_DA_ENDPOINT").unwrap(),
        "https://da.example.com"
    );
    assert_eq!(
        s.lifecycle
            .process_env()
            .get("qpu1_QRMI_IBM_DA_ENDPOINT")
            .unwrap(),
        "https://da.example.com"
    );
    assert_eq!(
        host.getenv("qpu2_QRMI_IBM_QRS_ENDPOINT").unwrap(),
        "https://qrs.example.com"
    );

    // acquisition tokens are published per resource
    assert_eq!(
        host.getenv("qpu1_QRMI_JOB_ACQUISITION_TOKEN").unwrap(),
        "token-qpu1"
    );
    assert_eq!(
        host.getenv("qpu2_QRMI_JOB_ACQUISITION_TOKEN").unwrap(),
        "token-qpu2"
    );
}

#[test]
fn test_partial_activation_skips_failed_acquisition() {
    let mut s = scenario(StubBehavior::default().broken_acquire("qpu2"), &[]);
    let mut host = MockJobContext::remote().with_option(QPU_OPTION, "qpu1,qpu2,qpu3");

    s.lifecycle.init(&mut host).unwrap();
    s.lifecycle.init_post_opt(&mut host).unwrap();

    assert_eq!(s.lifecycle.state(), LifecycleState::Activated);
    let names: Vec<&str> = s.lifecycle.tracker().iter().map(|r| r.name()).collect();
    assert_eq!(names, ["qpu1", "qpu3"]);
    assert_eq!(host.getenv(JOB_QPU_RESOURCES).unwrap(), "qpu1,qpu3");
    assert_eq!(
        host.getenv(JOB_QPU_TYPES).unwrap(),
        "direct-access,direct-access"
    );
}

#[test]
fn test_inaccessible_resource_is_skipped() {
    let mut s = scenario(StubBehavior::default().inaccessible("qpu1"), &[]);
    let mut host = MockJobContext::remote().with_option(QPU_OPTION, "qpu1,qpu2");

    s.lifecycle.init(&mut host).unwrap();
    s.lifecycle.init_post_opt(&mut host).unwrap();

    let names: Vec<&str> = s.lifecycle.tracker().iter().map(|r| r.name()).collect();
    assert_eq!(names, ["qpu2"]);
    assert!(host
        .getenv("qpu1_QRMI_JOB_ACQUISITION_TOKEN")
        .is_none());
}

#[test]
fn test_all_failures_abort_job_launch() {
    let mut s = scenario(
        StubBehavior::default()
            .broken_acquire("qpu1")
            .inaccessible("qpu2"),
        &[],
    );
    let mut host = MockJobContext::remote().with_option(QPU_OPTION, "qpu1,qpu2");

    s.lifecycle.init(&mut host).unwrap();
    let err = s.lifecycle.init_post_opt(&mut host).unwrap_err();

    assert!(matches!(err, SlurmError::NoResourcesAcquired));
    assert_eq!(s.lifecycle.state(), LifecycleState::Failed);

    // aggregates were cleared up front and never repopulated
    assert_eq!(host.getenv(JOB_QPU_RESOURCES).unwrap(), "");
    assert_eq!(host.getenv(JOB_QPU_TYPES).unwrap(), "");
}

#[test]
fn test_unknown_resource_name_is_skipped() {
    let mut s = scenario(StubBehavior::default(), &[]);
    let mut host = MockJobContext::remote().with_option(QPU_OPTION, "qpu1,ghost");

    s.lifecycle.init(&mut host).unwrap();
    s.lifecycle.init_post_opt(&mut host).unwrap();

    assert_eq!(s.lifecycle.state(), LifecycleState::Activated);
    assert_eq!(host.getenv(JOB_QPU_RESOURCES).unwrap(), "qpu1");
    assert_eq!(host.getenv(JOB_QPU_TYPES).unwrap(), "direct-access");
}

#[test]
fn test_job_supplied_override_wins_over_catalog() {
    let mut s = scenario(StubBehavior::default(), &[]);
    let mut host = MockJobContext::remote()
        .with_option(QPU_OPTION, "qpu1")
        .with_job_env("qpu1_QRMI_IBM_DA_ENDPOINT", "https://override.example.com");

    s.lifecycle.init(&mut host).unwrap();
    s.lifecycle.init_post_opt(&mut host).unwrap();

    assert_eq!(
        host.getenv("qpu1_QRMI_IBM_DA_ENDPOINT").unwrap(),
        "https://override.example.com"
    );
    assert_eq!(
        s.lifecycle
            .process_env()
            .get("qpu1_QRMI_IBM_DA_ENDPOINT")
            .unwrap(),
        "https://override.example.com"
    );
}

#[test]
fn test_preset_acquisition_token_is_kept() {
    let mut s = scenario(StubBehavior::default(), &[]);
    let mut host = MockJobContext::remote()
        .with_option(QPU_OPTION, "qpu1")
        .with_job_env("qpu1_QRMI_JOB_ACQUISITION_TOKEN", "preset");

    s.lifecycle.init(&mut host).unwrap();
    s.lifecycle.init_post_opt(&mut host).unwrap();

    assert_eq!(
        host.getenv("qpu1_QRMI_JOB_ACQUISITION_TOKEN").unwrap(),
        "preset"
    );
    assert_eq!(
        s.lifecycle
            .process_env()
            .get("qpu1_QRMI_JOB_ACQUISITION_TOKEN")
            .unwrap(),
        "preset"
    );
}

// ==== Policies ====

#[test]
fn test_duplicates_skipped_by_default() {
    let mut s = scenario(StubBehavior::default(), &[]);
    let mut host = MockJobContext::remote().with_option(QPU_OPTION, "qpu1,qpu1,qpu2");

    s.lifecycle.init(&mut host).unwrap();
    s.lifecycle.init_post_opt(&mut host).unwrap();

    assert_eq!(s.lifecycle.tracker().len(), 2);
    assert_eq!(host.getenv(JOB_QPU_RESOURCES).unwrap(), "qpu1,qpu2");
}

#[test]
fn test_duplicates_rejected_when_configured() {
    let mut s = scenario(StubBehavior::default(), &["duplicates=reject"]);
    let mut host = MockJobContext::remote().with_option(QPU_OPTION, "qpu1,qpu1");

    s.lifecycle.init(&mut host).unwrap();
    let err = s.lifecycle.init_post_opt(&mut host).unwrap_err();

    assert!(matches!(err, SlurmError::DuplicateResource(name) if name == "qpu1"));
    assert_eq!(s.lifecycle.state(), LifecycleState::Failed);
}

#[test]
fn test_duplicates_acquired_each_when_configured() {
    let mut s = scenario(StubBehavior::default(), &["duplicates=acquire-each"]);
    let mut host = MockJobContext::remote().with_option(QPU_OPTION, "qpu1,qpu1");

    s.lifecycle.init(&mut host).unwrap();
    s.lifecycle.init_post_opt(&mut host).unwrap();

    assert_eq!(s.lifecycle.tracker().len(), 2);
    assert_eq!(host.getenv(JOB_QPU_RESOURCES).unwrap(), "qpu1,qpu1");
}

#[test]
fn test_empty_request_ignored_by_default() {
    let mut s = scenario(StubBehavior::default(), &[]);
    let mut host = MockJobContext::remote().with_option(QPU_OPTION, " , ,");

    s.lifecycle.init(&mut host).unwrap();
    s.lifecycle.init_post_opt(&mut host).unwrap();

    assert_eq!(s.lifecycle.state(), LifecycleState::OptionsRegistered);
    assert!(host.getenv(JOB_QPU_RESOURCES).is_none());
}

#[test]
fn test_empty_request_fails_when_configured() {
    let mut s = scenario(StubBehavior::default(), &["empty-request=fail"]);
    let mut host = MockJobContext::remote().with_option(QPU_OPTION, " , ,");

    s.lifecycle.init(&mut host).unwrap();
    let err = s.lifecycle.init_post_opt(&mut host).unwrap_err();

    assert!(matches!(err, SlurmError::NoResourcesAcquired));
    assert_eq!(s.lifecycle.state(), LifecycleState::Failed);
}

// ==== Wall-time propagation ====

#[test]
fn test_timeout_propagated_in_seconds() {
    let mut s = scenario(StubBehavior::default(), &[]);
    let mut host = MockJobContext::remote()
        .with_option(QPU_OPTION, "qpu1,qpu2")
        .with_time_limit_minutes(30);

    s.lifecycle.init(&mut host).unwrap();
    s.lifecycle.init_post_opt(&mut host).unwrap();
    s.lifecycle.task_init(&mut host).unwrap();

    assert_eq!(s.lifecycle.state(), LifecycleState::Running);
    assert_eq!(
        host.getenv("qpu1_QRMI_JOB_TIMEOUT_SECONDS").unwrap(),
        "1800"
    );
    assert_eq!(
        host.getenv("qpu2_QRMI_JOB_TIMEOUT_SECONDS").unwrap(),
        "1800"
    );

    // second task in the same job sees the same value
    s.lifecycle.task_init(&mut host).unwrap();
    assert_eq!(
        host.getenv("qpu1_QRMI_JOB_TIMEOUT_SECONDS").unwrap(),
        "1800"
    );
}

#[test]
fn test_missing_time_limit_fails_task_launch() {
    let mut s = scenario(StubBehavior::default(), &[]);
    let mut host = MockJobContext::remote().with_option(QPU_OPTION, "qpu1");

    s.lifecycle.init(&mut host).unwrap();
    s.lifecycle.init_post_opt(&mut host).unwrap();
    let err = s.lifecycle.task_init(&mut host).unwrap_err();

    assert!(matches!(err, SlurmError::MissingTimeLimit));
}

#[test]
fn test_task_init_noop_without_option() {
    let mut s = scenario(StubBehavior::default(), &[]);
    let mut host = MockJobContext::remote().with_time_limit_minutes(30);

    s.lifecycle.init(&mut host).unwrap();
    s.lifecycle.task_init(&mut host).unwrap();

    assert_eq!(s.lifecycle.state(), LifecycleState::OptionsRegistered);
}

// ==== Release ====

#[test]
fn test_release_continues_past_failures() {
    let mut s = scenario(StubBehavior::default().broken_release("qpu1"), &[]);
    let mut host = MockJobContext::remote().with_option(QPU_OPTION, "qpu1,qpu2,qpu3");

    s.lifecycle.init(&mut host).unwrap();
    s.lifecycle.init_post_opt(&mut host).unwrap();
    assert_eq!(s.lifecycle.tracker().len(), 3);

    s.lifecycle.exit(&mut host).unwrap();

    assert_eq!(s.lifecycle.state(), LifecycleState::Done);
    assert!(s.lifecycle.tracker().is_empty());
    assert_eq!(released_names(&s), ["qpu2", "qpu3"]);
}

#[test]
fn test_exit_is_idempotent() {
    let mut s = scenario(StubBehavior::default(), &[]);
    let mut host = MockJobContext::remote().with_option(QPU_OPTION, "qpu1,qpu2");

    s.lifecycle.init(&mut host).unwrap();
    s.lifecycle.init_post_opt(&mut host).unwrap();
    s.lifecycle.exit(&mut host).unwrap();
    assert_eq!(released_names(&s), ["qpu1", "qpu2"]);

    s.lifecycle.exit(&mut host).unwrap();
    assert_eq!(released_names(&s), ["qpu1", "qpu2"]);
    assert_eq!(s.lifecycle.state(), LifecycleState::Done);

    assert!(s.lifecycle.request().is_none());
}
