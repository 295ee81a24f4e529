//! Types for the batch manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::convert::{ConversionResult, SourceFile};
use crate::media::Dimensions;
use crate::transform::ResizeConfig;

/// Lifecycle status of a batch item.
///
/// Valid transitions: `Queued -> Processing -> {Complete | Error}`, plus
/// `Error -> Queued` on an explicit retry and `Queued -> removed` on cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting to be processed.
    Queued,
    /// An attempt is in flight.
    Processing,
    /// Finished successfully. Terminal.
    Complete,
    /// All attempts exhausted. Terminal unless explicitly retried.
    Error,
}

impl ItemStatus {
    /// Stable string name, used in error messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// Whether this status ends the item's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// The authoritative record of one user-submitted file's conversion
/// lifecycle. Owned and mutated exclusively by the batch manager.
#[derive(Debug, Clone)]
pub struct ProcessingItem {
    /// Unique item id.
    pub id: String,
    /// The file as submitted (payload shared, not copied, across snapshots).
    pub source: SourceFile,
    /// Current lifecycle status.
    pub status: ItemStatus,
    /// Progress of the current attempt, 0-100. Monotonically non-decreasing
    /// while `Processing`; reset on each attempt start; 100 on `Complete`.
    pub progress: u8,
    /// Failure message. Set iff status is `Error`.
    pub error: Option<String>,
    /// Conversion output. Set iff status is `Complete`.
    pub result: Option<ConversionResult>,
    /// Start of the most recent attempt.
    pub started_at: Option<DateTime<Utc>>,
    /// End of the final attempt.
    pub finished_at: Option<DateTime<Utc>>,
    /// Wall time of the final attempt in milliseconds.
    pub duration_ms: Option<u64>,
    /// Pre-conversion resize specification. Mutable only while `Queued` or
    /// `Processing`.
    pub resize: Option<ResizeConfig>,
    /// Source dimensions, populated asynchronously after `add_files`.
    pub original_dimensions: Option<Dimensions>,
}

impl ProcessingItem {
    /// Creates a fresh `Queued` item.
    pub(crate) fn new(id: String, source: SourceFile) -> Self {
        Self {
            id,
            source,
            status: ItemStatus::Queued,
            progress: 0,
            error: None,
            result: None,
            started_at: None,
            finished_at: None,
            duration_ms: None,
            resize: None,
            original_dimensions: None,
        }
    }
}

/// Derived view of the whole batch, recomputed on every mutation.
#[derive(Debug, Clone)]
pub struct BatchState {
    /// Snapshot of all tracked items, keyed by id.
    pub items: HashMap<String, ProcessingItem>,
    /// Number of tracked items.
    pub total_items: usize,
    /// Items in `Complete` status.
    pub completed_count: usize,
    /// Items in `Error` status.
    pub failed_count: usize,
    /// Whether a `process_batch` call is active.
    pub is_processing: bool,
    /// `round(completed / total * 100)`, 0 when the batch is empty.
    pub overall_progress_percent: u8,
}

impl BatchState {
    /// Derives the batch view from an item map.
    pub(crate) fn derive(
        items: &HashMap<String, ProcessingItem>,
        is_processing: bool,
    ) -> Self {
        let total_items = items.len();
        let completed_count = items
            .values()
            .filter(|i| i.status == ItemStatus::Complete)
            .count();
        let failed_count = items
            .values()
            .filter(|i| i.status == ItemStatus::Error)
            .count();
        let overall_progress_percent = if total_items > 0 {
            ((completed_count as f64 / total_items as f64) * 100.0).round() as u8
        } else {
            0
        };

        Self {
            items: items.clone(),
            total_items,
            completed_count,
            failed_count,
            is_processing,
            overall_progress_percent,
        }
    }
}
