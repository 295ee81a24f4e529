//! Error types for the worker pool.

use thiserror::Error;

/// Errors surfaced by the worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// `initialize` has not been called (or did not succeed).
    #[error("Worker pool is not initialized")]
    NotInitialized,

    /// `initialize` was called twice.
    #[error("Worker pool is already initialized")]
    AlreadyInitialized,

    /// One or more execution units failed to start. The pool refuses to come
    /// up partially.
    #[error("Failed to start execution units: {reason}")]
    SpawnFailed { reason: String },

    /// The unit bound to this task reported a failure.
    #[error("Task failed: {message}")]
    Task { message: String },

    /// The unit bound to this task went away before replying.
    #[error("Execution unit {unit} crashed while the task was bound to it")]
    UnitCrashed { unit: usize },

    /// The pool was terminated while the task was still pending.
    #[error("Worker pool terminated")]
    Terminated,
}

impl PoolError {
    /// Creates a new spawn failed error.
    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            reason: reason.into(),
        }
    }

    /// Whether a retry of the same task could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Task { .. } | Self::UnitCrashed { .. })
    }
}
