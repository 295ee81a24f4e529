//! Derived batch statistics.

use serde::{Deserialize, Serialize};

use super::types::{ItemStatus, ProcessingItem};

/// Aggregate statistics over a batch, derived from `Complete` items only
/// (failures are tallied but contribute nothing to the size/duration sums).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    /// Items that finished successfully.
    pub completed_items: usize,
    /// Items that exhausted their retries.
    pub failed_items: usize,
    /// Sum of input sizes across completed items.
    pub total_original_bytes: u64,
    /// Sum of output sizes across completed items.
    pub total_converted_bytes: u64,
    /// Bytes saved across completed items. Negative when outputs grew.
    pub total_bytes_saved: i64,
    /// Mean of each completed item's own compression ratio (output/input),
    /// not the ratio of the sums.
    pub average_compression_ratio: f64,
    /// Sum of processing durations across completed items, in milliseconds.
    pub total_duration_ms: u64,
    /// Mean processing duration of completed items, in milliseconds.
    pub average_duration_ms: f64,
}

impl BatchStatistics {
    /// Computes statistics from an item collection.
    pub(crate) fn compute<'a>(items: impl Iterator<Item = &'a ProcessingItem>) -> Self {
        let mut stats = Self::default();
        let mut ratio_sum = 0.0;

        for item in items {
            match item.status {
                ItemStatus::Error => stats.failed_items += 1,
                ItemStatus::Complete => {
                    let Some(result) = &item.result else { continue };
                    stats.completed_items += 1;
                    stats.total_original_bytes += result.original_size_bytes;
                    stats.total_converted_bytes += result.converted_size_bytes;
                    stats.total_bytes_saved += result.bytes_saved();
                    ratio_sum += result.compression_ratio();
                    stats.total_duration_ms += item.duration_ms.unwrap_or(0);
                }
                _ => {}
            }
        }

        if stats.completed_items > 0 {
            stats.average_compression_ratio = ratio_sum / stats.completed_items as f64;
            stats.average_duration_ms =
                stats.total_duration_ms as f64 / stats.completed_items as f64;
        }

        stats
    }
}
