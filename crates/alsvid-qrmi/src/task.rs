//! Task lifecycle types.
//!
//! The task state machine, as reported by every adapter:
//!
//! ```text
//!   task_start() ──→ Queued ──→ Running ──→ Completed
//!                      │           │
//!                      │           ├──→ Failed
//!                      │           │
//!                      └───────────┴──→ Cancelled
//! ```
//!
//! **Invariants:**
//! - Transitions are monotonic — a task never moves backward.
//! - Terminal states (`Completed`, `Failed`, `Cancelled`) are permanent.
//! - `task_result()` is only meaningful when status is `Completed`.

use serde::{Deserialize, Serialize};

/// Unique identifier for a task running on a leased resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a new task ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Task is waiting in queue.
    Queued,
    /// Task is currently running.
    Running,
    /// Task completed successfully.
    Completed,
    /// Task failed.
    Failed,
    /// Task was cancelled.
    Cancelled,
}

impl TaskStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Check if the task is still pending (queued or running).
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskStatus::Queued | TaskStatus::Running)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "Queued"),
            TaskStatus::Running => write!(f, "Running"),
            TaskStatus::Completed => write!(f, "Completed"),
            TaskStatus::Failed => write!(f, "Failed"),
            TaskStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Input handed to [`task_start`](crate::QuantumResource::task_start).
///
/// Each variant matches one service family; adapters reject payloads of
/// the wrong shape with
/// [`QrmiError::InvalidPayload`](crate::QrmiError::InvalidPayload).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Payload {
    /// Qiskit primitive job: serialized primitive input plus the program
    /// to run it with (`sampler` or `estimator`).
    QiskitPrimitive {
        /// Primitive input as JSON text.
        input: String,
        /// Program identifier.
        program_id: String,
    },
    /// Pulser sequence for neutral-atom devices.
    PulserSequence {
        /// Serialized pulse sequence.
        sequence: String,
        /// Number of runs per job.
        job_runs: u32,
    },
}

/// Device description used by client programs to compile payloads.
///
/// The content is adapter-specific JSON text (backend configuration and
/// properties, or device specs); the lifecycle core never inspects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Serialized target description.
    pub value: String,
}

/// Result of a completed task, as adapter-specific JSON text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Serialized result document.
    pub value: String,
}
