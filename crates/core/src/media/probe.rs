//! Header-only dimension probing.

use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

/// Pixel dimensions of an image or video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Errors from the media utilities.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Buffer matched no known format signature.
    #[error("Buffer matches no known media format")]
    UnknownFormat,

    /// Header could not be read.
    #[error("Failed to probe media header: {reason}")]
    ProbeFailed { reason: String },
}

impl MediaError {
    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }
}

/// Probes the pixel dimensions of an image buffer without a full decode.
///
/// Only the container header is read, so this is cheap enough to run for
/// every file added to a batch.
pub fn probe_dimensions(bytes: &[u8]) -> Result<Dimensions, MediaError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MediaError::probe_failed(format!("failed to read header: {e}")))?;

    if reader.format().is_none() {
        return Err(MediaError::UnknownFormat);
    }

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| MediaError::probe_failed(format!("failed to read dimensions: {e}")))?;

    Ok(Dimensions { width, height })
}
