//! Types for the conversion service.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::media::{Dimensions, MediaFormat};

/// An in-memory file: raw bytes plus the metadata the conversion flow needs.
///
/// The payload sits behind an `Arc` so batch state snapshots can clone items
/// without copying file contents.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Original filename, used to derive the output name.
    pub name: String,
    /// File contents.
    pub data: Arc<Vec<u8>>,
}

impl SourceFile {
    /// Creates a new source file.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data: Arc::new(data),
        }
    }

    /// Size of the file in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Converted bytes. Shared so state snapshots stay cheap.
    pub data: Arc<Vec<u8>>,
    /// Target format.
    pub format: MediaFormat,
    /// MIME type of the output.
    pub mime_type: String,
    /// Derived output filename (original base name + target extension).
    pub filename: String,
    /// Pixel dimensions of the output, when the execution unit reported them.
    pub dimensions: Option<Dimensions>,
    /// Size of the input in bytes.
    pub original_size_bytes: u64,
    /// Size of the output in bytes.
    pub converted_size_bytes: u64,
}

impl ConversionResult {
    /// Bytes saved by the conversion. Negative when the output grew.
    pub fn bytes_saved(&self) -> i64 {
        self.original_size_bytes as i64 - self.converted_size_bytes as i64
    }

    /// Output size as a fraction of input size (1.0 = no change).
    pub fn compression_ratio(&self) -> f64 {
        if self.original_size_bytes == 0 {
            return 0.0;
        }
        self.converted_size_bytes as f64 / self.original_size_bytes as f64
    }
}

/// Coarse progress for the batch conversion helpers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Files completed so far.
    pub completed: usize,
    /// Total files in the batch.
    pub total: usize,
    /// File most recently started (sequential) or finished (parallel).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
}
