//! Error handling for the SPANK lifecycle.

use thiserror::Error;

use crate::host::HostError;

/// Result type for lifecycle operations.
pub type SlurmResult<T> = Result<T, SlurmError>;

/// Errors that abort a lifecycle hook.
///
/// Per-resource acquisition problems are [`AcquireError`] and never abort
/// a hook on their own; only the conditions below do.
#[derive(Error, Debug)]
pub enum SlurmError {
    /// Nothing in the request could be activated. Fatal to job launch.
    #[error("No QPU resource available")]
    NoResourcesAcquired,

    /// The scheduler did not report a wall-time limit. Fatal for the
    /// timeout-propagation hook only.
    #[error("Job time limit is not available from the scheduler")]
    MissingTimeLimit,

    /// A resource name appears twice in one request under the `reject`
    /// duplicate policy.
    #[error("Duplicate resource name in request: {0}")]
    DuplicateResource(String),

    /// Site configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed plugin argument in plugstack.conf.
    #[error("Invalid plugin argument: {0}")]
    PluginArg(String),

    /// The current-thread runtime could not be started.
    #[error("Runtime initialization failed: {0}")]
    Runtime(String),

    /// The host scheduler rejected an operation.
    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

/// Per-resource acquisition failures.
///
/// Logged and skipped by the activation loop; only an empty tracker after
/// the full request escalates to [`SlurmError::NoResourcesAcquired`].
#[derive(Error, Debug)]
pub enum AcquireError {
    /// The resource is offline, paused, or the accessibility probe failed.
    #[error("Resource '{name}' is not accessible: {reason}")]
    NotAccessible { name: String, reason: String },

    /// The client could not be built or the lease request failed.
    #[error("Failed to acquire '{name}': {reason}")]
    AcquisitionFailed { name: String, reason: String },
}
