//! Error types for the transcoding boundary.

use thiserror::Error;

/// Errors reported by a transcoding engine.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The engine run failed.
    #[error("Transcode failed: {reason}")]
    EngineFailed {
        reason: String,
        /// Engine log output, when available.
        log: Option<String>,
    },

    /// The argument list was rejected by the engine.
    #[error("Invalid transcode arguments: {reason}")]
    InvalidArguments { reason: String },

    /// The named input was not present in the engine's file system.
    #[error("Input not found in engine file system: {name}")]
    InputNotFound { name: String },
}

impl TranscodeError {
    /// Creates a new engine failed error with optional log output.
    pub fn engine_failed(reason: impl Into<String>, log: Option<String>) -> Self {
        Self::EngineFailed {
            reason: reason.into(),
            log,
        }
    }

    /// Creates a new invalid arguments error.
    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            reason: reason.into(),
        }
    }
}
