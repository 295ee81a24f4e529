//! Error types for the codec module.

use thiserror::Error;

use crate::media::MediaFormat;

/// Errors that can occur inside a codec engine.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The engine does not handle this format.
    #[error("Unsupported format: {format:?}")]
    UnsupportedFormat { format: MediaFormat },

    /// The requested operation is not valid for the request.
    #[error("Invalid task: {reason}")]
    InvalidTask { reason: String },

    /// Decoding the payload failed.
    #[error("Decode failed: {reason}")]
    DecodeFailed { reason: String },

    /// Encoding to the target format failed.
    #[error("Encode failed: {reason}")]
    EncodeFailed { reason: String },

    /// An `Encode` request arrived without raw dimensions.
    #[error("Raw payload dimensions missing for encode operation")]
    MissingDimensions,

    /// The engine is not ready to accept work.
    #[error("Engine not ready: {reason}")]
    NotReady { reason: String },
}

impl CodecError {
    /// Creates a new decode failed error.
    pub fn decode_failed(reason: impl Into<String>) -> Self {
        Self::DecodeFailed {
            reason: reason.into(),
        }
    }

    /// Creates a new encode failed error.
    pub fn encode_failed(reason: impl Into<String>) -> Self {
        Self::EncodeFailed {
            reason: reason.into(),
        }
    }

    /// Creates a new invalid task error.
    pub fn invalid_task(reason: impl Into<String>) -> Self {
        Self::InvalidTask {
            reason: reason.into(),
        }
    }

    /// Creates a new not ready error.
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self::NotReady {
            reason: reason.into(),
        }
    }
}
