//! Configuration for the batch manager.

use serde::{Deserialize, Serialize};

/// Configuration for the batch processing manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Retries per item after its first failed attempt. An always-failing
    /// item settles as `Error` after `max_retries + 1` attempts.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Explicit bound on concurrently processing items. `None` sizes the
    /// bound to the worker pool's unit count.
    #[serde(default)]
    pub max_parallel_items: Option<usize>,
}

fn default_max_retries() -> u32 {
    2
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            max_parallel_items: None,
        }
    }
}

impl BatchConfig {
    /// Sets the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets an explicit item-concurrency bound.
    pub fn with_max_parallel_items(mut self, max: usize) -> Self {
        self.max_parallel_items = Some(max);
        self
    }
}
