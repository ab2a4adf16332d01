//! The quantum resource trait.
//!
//! [`QuantumResource`] defines the lease and task lifecycle for one named
//! QPU resource:
//!
//! ```text
//!   is_accessible() ──→ acquire() ──→ task_start() ──→ task_status() ──→ task_result()
//!       (async)          (async)        (async)          (async)           (async)
//! ```
//!
//! ## Design principles
//!
//! - **Async-native**: every service call is async; callers in synchronous
//!   hook code drive them with `Runtime::block_on`.
//! - **Thread-safe**: `Send + Sync` bound enables shared ownership.
//! - **Name-scoped configuration**: adapters configure themselves from
//!   `{name}_`-prefixed process environment variables at construction, so
//!   several resources of the same type coexist in one process.
//! - **Opaque tokens**: `acquire` returns a credential string the caller
//!   stores and later passes to `release`; its meaning is adapter-internal
//!   (a session id for session-capable services, a generated UUID
//!   otherwise).
//!
//! ## Method table
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `name()` | sync | yes | `&str` |
//! | `resource_type()` | sync | yes | `ResourceType` |
//! | `is_accessible()` | async | yes | `QrmiResult<bool>` |
//! | `acquire()` | async | yes | `QrmiResult<String>` |
//! | `release()` | async | yes | `QrmiResult<()>` |
//! | `target()` | async | yes | `QrmiResult<Target>` |
//! | `task_start()` | async | yes | `QrmiResult<TaskId>` |
//! | `task_stop()` | async | yes | `QrmiResult<()>` |
//! | `task_status()` | async | yes | `QrmiResult<TaskStatus>` |
//! | `task_result()` | async | yes | `QrmiResult<TaskResult>` |
//! | `metadata()` | sync | provided | `HashMap<String, String>` |
//! | `task_wait()` | async | provided | `QrmiResult<TaskStatus>` |

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::QrmiResult;
use crate::resource_type::ResourceType;
use crate::task::{Payload, Target, TaskId, TaskResult, TaskStatus};

/// A remotely-managed quantum resource leased to batch jobs.
#[async_trait]
pub trait QuantumResource: Send + Sync {
    /// Resource name, as configured at the site (e.g. `"heron1"`).
    fn name(&self) -> &str;

    /// Service family this resource belongs to.
    fn resource_type(&self) -> ResourceType;

    /// Whether this process can use the resource right now.
    ///
    /// `Ok(false)` means the service answered and said no (offline,
    /// paused, maintenance); `Err` means the probe itself failed.
    async fn is_accessible(&self) -> QrmiResult<bool>;

    /// Obtain a lease and return its acquisition token.
    async fn acquire(&mut self) -> QrmiResult<String>;

    /// Return a lease previously obtained with [`acquire`](Self::acquire).
    async fn release(&mut self, token: &str) -> QrmiResult<()>;

    /// Device description for payload compilation.
    async fn target(&self) -> QrmiResult<Target>;

    /// Start a task on the leased resource.
    async fn task_start(&mut self, payload: Payload) -> QrmiResult<TaskId>;

    /// Stop (cancel) a task.
    async fn task_stop(&mut self, task_id: &TaskId) -> QrmiResult<()>;

    /// Query the status of a task.
    async fn task_status(&self, task_id: &TaskId) -> QrmiResult<TaskStatus>;

    /// Fetch the result of a completed task.
    async fn task_result(&self, task_id: &TaskId) -> QrmiResult<TaskResult>;

    /// Adapter-specific metadata (endpoints, session mode, storage
    /// locations). Empty by default.
    fn metadata(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    /// Poll a task until it reaches a terminal state.
    ///
    /// No deadline is imposed here; callers that need one wrap this in
    /// their own timeout or cancellation.
    async fn task_wait(&self, task_id: &TaskId, poll_interval: Duration) -> QrmiResult<TaskStatus> {
        use tokio::time::sleep;

        loop {
            let status = self.task_status(task_id).await?;
            if status.is_terminal() {
                return Ok(status);
            }
            sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QrmiError;

    struct FlakyResource {
        polls_until_done: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl QuantumResource for FlakyResource {
        fn name(&self) -> &str {
            "flaky"
        }

        fn resource_type(&self) -> ResourceType {
            ResourceType::DirectAccess
        }

        async fn is_accessible(&self) -> QrmiResult<bool> {
            Ok(true)
        }

        async fn acquire(&mut self) -> QrmiResult<String> {
            Ok("token".to_string())
        }

        async fn release(&mut self, _token: &str) -> QrmiResult<()> {
            Ok(())
        }

        async fn target(&self) -> QrmiResult<Target> {
            Ok(Target {
                value: "{}".to_string(),
            })
        }

        async fn task_start(&mut self, _payload: Payload) -> QrmiResult<TaskId> {
            Ok(TaskId::new("t1"))
        }

        async fn task_stop(&mut self, _task_id: &TaskId) -> QrmiResult<()> {
            Ok(())
        }

        async fn task_status(&self, task_id: &TaskId) -> QrmiResult<TaskStatus> {
            if task_id.0 != "t1" {
                return Err(QrmiError::TaskNotFound(task_id.0.clone()));
            }
            let left = self
                .polls_until_done
                .fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            if left <= 1 {
                Ok(TaskStatus::Completed)
            } else {
                Ok(TaskStatus::Running)
            }
        }

        async fn task_result(&self, _task_id: &TaskId) -> QrmiResult<TaskResult> {
            Ok(TaskResult {
                value: "{}".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_task_wait_polls_to_terminal() {
        let resource = FlakyResource {
            polls_until_done: std::sync::atomic::AtomicU32::new(3),
        };
        let status = resource
            .task_wait(&TaskId::new("t1"), Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_task_wait_propagates_errors() {
        let resource = FlakyResource {
            polls_until_done: std::sync::atomic::AtomicU32::new(1),
        };
        let err = resource
            .task_wait(&TaskId::new("missing"), Duration::from_millis(1))
            .await
            .unwrap_err();
        assert!(matches!(err, QrmiError::TaskNotFound(_)));
    }
}
