//! Bounded worker pool for codec tasks.
//!
//! The pool owns a fixed set of execution units (long-lived tokio tasks, one
//! per unit) and a dispatcher that matches queued tasks to idle units. Tasks
//! start in FIFO submission order relative to unit availability; completion
//! order is unordered. Payload buffers move into requests and requests move
//! into units, so the submitting side never touches a buffer after handoff.

mod error;
mod pool;
mod types;
mod worker;

pub use error::PoolError;
pub use pool::WorkerPool;
pub use types::{PoolConfig, PoolStatus, TaskResult};
