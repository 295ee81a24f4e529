//! Batch processing manager.
//!
//! The core state machine of the conversion flow. The manager owns the
//! authoritative map of [`ProcessingItem`]s, runs bounded-concurrency batch
//! conversion over the pool, retries failed attempts up to a fixed budget,
//! supports cancellation of queued items and live resize reconfiguration,
//! and publishes derived state to subscribers on every mutation.

mod config;
mod error;
mod manager;
mod observer;
mod stats;
mod types;

pub use config::BatchConfig;
pub use error::BatchError;
pub use manager::BatchManager;
pub use observer::SubscriptionId;
pub use stats::BatchStatistics;
pub use types::{BatchState, ItemStatus, ProcessingItem};
