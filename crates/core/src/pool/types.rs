//! Types for the worker pool.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::media::Dimensions;

/// Configuration for the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Requested number of execution units. The effective count is capped at
    /// the host's available parallelism.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

impl PoolConfig {
    /// Sets the requested unit count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Effective unit count: `min(requested, available_parallelism)`, at
    /// least one.
    pub fn effective_workers(&self) -> usize {
        self.workers.clamp(1, default_workers().max(1))
    }
}

/// Successful result of one pool task.
#[derive(Debug)]
pub struct TaskResult {
    /// Result bytes produced by the execution unit.
    pub payload: Vec<u8>,
    /// Pixel dimensions of the result, when the unit reported them.
    pub dimensions: Option<Dimensions>,
}

/// Counters shared between the pool handle and its dispatcher.
#[derive(Debug, Default)]
pub(crate) struct PoolStats {
    pub queued: AtomicU64,
    pub active: AtomicU64,
    pub total_processed: AtomicU64,
    pub total_failed: AtomicU64,
}

impl PoolStats {
    pub(crate) fn to_status(&self, workers: usize) -> PoolStatus {
        PoolStatus {
            workers,
            active_tasks: self.active.load(Ordering::Relaxed) as usize,
            queued_tasks: self.queued.load(Ordering::Relaxed) as usize,
            total_processed: self.total_processed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time status of the pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Number of execution units.
    pub workers: usize,
    /// Tasks currently bound to a unit.
    pub active_tasks: usize,
    /// Tasks waiting for an idle unit.
    pub queued_tasks: usize,
    /// Tasks completed successfully since startup.
    pub total_processed: u64,
    /// Tasks failed since startup.
    pub total_failed: u64,
}
