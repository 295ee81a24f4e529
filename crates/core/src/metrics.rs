//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Worker pool (tasks submitted, completed, failed)
//! - Conversion service (conversions, durations, byte volumes)
//! - Batch manager (items, retries, batches)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Worker Pool Metrics
// =============================================================================

/// Tasks submitted to the pool.
pub static TASKS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediamorph_tasks_submitted_total",
        "Total tasks submitted to the worker pool",
    )
    .unwrap()
});

/// Tasks settled by the pool, by result.
pub static TASKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediamorph_tasks_total", "Total tasks settled by the pool"),
        &["result"], // "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions total by result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediamorph_conversions_total", "Total file conversions"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediamorph_conversion_duration_seconds",
            "Duration of file conversions",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0, 60.0]),
        &[],
    )
    .unwrap()
});

/// Input bytes consumed by conversions.
pub static BYTES_IN: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediamorph_conversion_bytes_in_total",
        "Total input bytes consumed by conversions",
    )
    .unwrap()
});

/// Output bytes produced by conversions.
pub static BYTES_OUT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediamorph_conversion_bytes_out_total",
        "Total output bytes produced by conversions",
    )
    .unwrap()
});

// =============================================================================
// Batch Manager Metrics
// =============================================================================

/// Batches started.
pub static BATCHES_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("mediamorph_batches_started_total", "Total batches started").unwrap()
});

/// Items settled by the batch manager, by result.
pub static ITEMS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediamorph_items_total",
            "Total batch items settled, by result",
        ),
        &["result"], // "complete", "error", "cancelled"
    )
    .unwrap()
});

/// Retry attempts total.
pub static RETRY_ATTEMPTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediamorph_retry_attempts_total",
        "Total per-item retry attempts",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Pool
        Box::new(TASKS_SUBMITTED.clone()),
        Box::new(TASKS_TOTAL.clone()),
        // Conversion
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(BYTES_IN.clone()),
        Box::new(BYTES_OUT.clone()),
        // Batch
        Box::new(BATCHES_STARTED.clone()),
        Box::new(ITEMS_TOTAL.clone()),
        Box::new(RETRY_ATTEMPTS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
    }
}
