//! Acquired-resource tracking.
//!
//! The tracker is the single authority on what this job actually leased.
//! It is append-only while the activation loop runs, feeds the aggregate
//! environment variables in acquisition order, and drives the best-effort
//! release pass at job exit.

use tracing::{error, info};

use alsvid_qrmi::{ResourceRegistry, ResourceType};

use crate::error::AcquireError;

/// One successfully leased resource.
#[derive(Debug)]
pub struct AcquiredResource {
    name: String,
    resource_type: ResourceType,
    token: Option<String>,
}

impl AcquiredResource {
    fn new(name: String, resource_type: ResourceType, token: String) -> Self {
        Self {
            name,
            resource_type,
            token: Some(token),
        }
    }

    /// Resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Service family.
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// The acquisition token; `None` once released.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// Outcome of a release pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseSummary {
    /// Records whose lease was returned.
    pub released: usize,
    /// Records whose release call failed (token cleared regardless).
    pub failed: usize,
}

impl ReleaseSummary {
    /// Whether every attempted release succeeded.
    pub fn all_released(&self) -> bool {
        self.failed == 0
    }
}

/// Ordered record of the resources this job holds.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    records: Vec<AcquiredResource>,
}

impl ResourceTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Tracked records in acquisition order.
    pub fn iter(&self) -> impl Iterator<Item = &AcquiredResource> {
        self.records.iter()
    }

    /// Whether a name is already tracked.
    pub fn contains_name(&self, name: &str) -> bool {
        self.records.iter().any(|r| r.name == name)
    }

    /// Probe and lease one resource, appending a record on success.
    ///
    /// The client handle lives only for this call; it is dropped on every
    /// exit path. Failures map to the two non-fatal acquisition errors
    /// and leave the tracker untouched.
    pub async fn acquire(
        &mut self,
        registry: &ResourceRegistry,
        name: &str,
        resource_type: ResourceType,
    ) -> Result<&AcquiredResource, AcquireError> {
        let mut client =
            registry
                .create(name, resource_type)
                .map_err(|e| AcquireError::AcquisitionFailed {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;

        match client.is_accessible().await {
            Ok(true) => {}
            Ok(false) => {
                return Err(AcquireError::NotAccessible {
                    name: name.to_string(),
                    reason: "resource reported inaccessible".to_string(),
                });
            }
            Err(e) => {
                return Err(AcquireError::NotAccessible {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
            }
        }

        let token = client
            .acquire()
            .await
            .map_err(|e| AcquireError::AcquisitionFailed {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        info!("Acquired '{}' ({})", name, resource_type);
        let idx = self.records.len();
        self.records
            .push(AcquiredResource::new(name.to_string(), resource_type, token));
        Ok(&self.records[idx])
    }

    /// Release every tracked record and drain the tracker.
    ///
    /// Each record's token is taken before the service call, so a failed
    /// release still clears it and a record is never released twice. A
    /// failure never skips the remaining records.
    pub async fn release_all(&mut self, registry: &ResourceRegistry) -> ReleaseSummary {
        let mut summary = ReleaseSummary::default();

        for record in &mut self.records {
            let Some(token) = record.token.take() else {
                continue;
            };

            match registry.create(&record.name, record.resource_type) {
                Ok(mut client) => match client.release(&token).await {
                    Ok(()) => {
                        info!("Released '{}'", record.name);
                        summary.released += 1;
                    }
                    Err(e) => {
                        error!("Failed to release '{}': {}", record.name, e);
                        summary.failed += 1;
                    }
                },
                Err(e) => {
                    error!("Failed to release '{}': {}", record.name, e);
                    summary.failed += 1;
                }
            }
        }

        self.records.clear();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use alsvid_qrmi::{
        Payload, QrmiError, QrmiResult, QuantumResource, Target, TaskId, TaskResult, TaskStatus,
    };

    /// Scripted in-memory resource for driving the tracker.
    struct ScriptedResource {
        name: String,
        accessible: bool,
        acquire_ok: bool,
        release_ok: bool,
        released: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl QuantumResource for ScriptedResource {
        fn name(&self) -> &str {
            &self.name
        }

        fn resource_type(&self) -> ResourceType {
            ResourceType::DirectAccess
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
                    reason: "scripted failure".to_string(),
                })
            }
        }

        async fn release(&mut self, token: &str) -> QrmiResult<()> {
            if self.release_ok {
                self.released.lock().unwrap().push(token.to_string());
                Ok(())
            } else {
                Err(QrmiError::ReleaseFailed {
                    name: self.name.clone(),
                    reason: "scripted failure".to_string(),
                })
            }
        }

        async fn target(&self) -> QrmiResult<Target> {
            Ok(Target {
                value: "{}".to_string(),
            })
        }

        async fn task_start(&mut self, _payload: Payload) -> QrmiResult<TaskId> {
            Ok(TaskId::new("t"))
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

    /// Registry whose direct-access factory follows per-name scripts.
    fn scripted_registry(
        scripts: &[(&str, bool, bool, bool)],
        released: Arc<Mutex<Vec<String>>>,
    ) -> ResourceRegistry {
        let scripts: HashMap<String, (bool, bool, bool)> = scripts
            .iter()
            .map(|(n, a, q, r)| (n.to_string(), (*a, *q, *r)))
            .collect();

        let mut registry = ResourceRegistry::new();
        registry.register(ResourceType::DirectAccess, move |name| {
            let Some((accessible, acquire_ok, release_ok)) = scripts.get(name).copied() else {
                return Err(QrmiError::MissingEnv(format!("{name}_QRMI_IBM_DA_ENDPOINT")));
            };
            Ok(Box::new(ScriptedResource {
                name: name.to_string(),
                accessible,
                acquire_ok,
                release_ok,
                released: released.clone(),
            }))
        });
        registry
    }

    #[tokio::test]
    async fn test_acquire_appends_in_order() {
        let released = Arc::new(Mutex::new(Vec::new()));
        let registry = scripted_registry(
            &[("qpu1", true, true, true), ("qpu2", true, true, true)],
            released,
        );

        let mut tracker = ResourceTracker::new();
        tracker
            .acquire(&registry, "qpu1", ResourceType::DirectAccess)
            .await
            .unwrap();
        tracker
            .acquire(&registry, "qpu2", ResourceType::DirectAccess)
            .await
            .unwrap();

        assert_eq!(tracker.len(), 2);
        let names: Vec<_> = tracker.iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, ["qpu1", "qpu2"]);
        assert!(tracker.contains_name("qpu1"));
        assert_eq!(
            tracker.iter().next().unwrap().token().unwrap(),
            "token-qpu1"
        );
    }

    #[tokio::test]
    async fn test_inaccessible_resource_is_not_tracked() {
        let released = Arc::new(Mutex::new(Vec::new()));
        let registry = scripted_registry(&[("down", false, true, true)], released);

        let mut tracker = ResourceTracker::new();
        let err = tracker
            .acquire(&registry, "down", ResourceType::DirectAccess)
            .await
            .unwrap_err();

        assert!(matches!(err, AcquireError::NotAccessible { .. }));
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_failed_acquisition_is_not_tracked() {
        let released = Arc::new(Mutex::new(Vec::new()));
        let registry = scripted_registry(&[("busy", true, false, true)], released);

        let mut tracker = ResourceTracker::new();
        let err = tracker
            .acquire(&registry, "busy", ResourceType::DirectAccess)
            .await
            .unwrap_err();

        assert!(matches!(err, AcquireError::AcquisitionFailed { .. }));
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_client_maps_to_acquisition_failed() {
        let released = Arc::new(Mutex::new(Vec::new()));
        let registry = scripted_registry(&[], released);

        let mut tracker = ResourceTracker::new();
        let err = tracker
            .acquire(&registry, "ghost", ResourceType::DirectAccess)
            .await
            .unwrap_err();
        assert!(matches!(err, AcquireError::AcquisitionFailed { .. }));

        // no pasqal factory registered at all
        let err = tracker
            .acquire(&registry, "ghost", ResourceType::PasqalCloud)
            .await
            .unwrap_err();
        assert!(matches!(err, AcquireError::AcquisitionFailed { .. }));
    }

    #[tokio::test]
    async fn test_release_all_never_short_circuits() {
        let released = Arc::new(Mutex::new(Vec::new()));
        let registry = scripted_registry(
            &[
                ("qpu1", true, true, false),
                ("qpu2", true, true, true),
                ("qpu3", true, true, true),
            ],
            released.clone(),
        );

        let mut tracker = ResourceTracker::new();
        for name in ["qpu1", "qpu2", "qpu3"] {
            tracker
                .acquire(&registry, name, ResourceType::DirectAccess)
                .await
                .unwrap();
        }

        let summary = tracker.release_all(&registry).await;
        assert_eq!(summary.released, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.all_released());

        // the failing first release did not stop the other two
        assert_eq!(
            released.lock().unwrap().as_slice(),
            ["token-qpu2", "token-qpu3"]
        );
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_release_all_twice_is_noop() {
        let released = Arc::new(Mutex::new(Vec::new()));
        let registry = scripted_registry(&[("qpu1", true, true, true)], released.clone());

        let mut tracker = ResourceTracker::new();
        tracker
            .acquire(&registry, "qpu1", ResourceType::DirectAccess)
            .await
            .unwrap();

        let first = tracker.release_all(&registry).await;
        assert_eq!(first.released, 1);

        let second = tracker.release_all(&registry).await;
        assert_eq!(second, ReleaseSummary::default());
        assert_eq!(released.lock().unwrap().len(), 1);
    }
}
