//! Error types for the batch manager.

use thiserror::Error;

/// Errors surfaced by the batch manager's operations.
#[derive(Debug, Error)]
pub enum BatchError {
    /// `process_batch` was called while another batch is active. Concurrent
    /// batches are rejected, never queued.
    #[error("A batch is already being processed")]
    AlreadyRunning,

    /// The item id is not in the map.
    #[error("Item not found: {id}")]
    ItemNotFound { id: String },

    /// The operation is not valid for the item's current status.
    #[error("Item {id} is {actual}, expected {expected}")]
    InvalidStatus {
        id: String,
        expected: &'static str,
        actual: &'static str,
    },
}
