//! Error types for the conversion service.

use thiserror::Error;

use crate::media::MediaFormat;
use crate::pool::PoolError;

/// Errors that can occur during a conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The source buffer matched no known format signature. Retrying cannot
    /// change the outcome.
    #[error("Could not detect source format of '{filename}' from magic bytes")]
    FormatDetection { filename: String },

    /// The requested format is not handled by the codec pool.
    #[error("Format {format:?} is not supported by the conversion service")]
    UnsupportedFormat { format: MediaFormat },

    /// The underlying pool task failed.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl ConvertError {
    /// Whether a retry of the same conversion could plausibly succeed.
    ///
    /// Format-detection and unsupported-format failures are terminal; task
    /// failures may be transient and are left to the caller's retry policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::FormatDetection { .. } | Self::UnsupportedFormat { .. } => false,
            Self::Pool(e) => e.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection_is_terminal() {
        let err = ConvertError::FormatDetection {
            filename: "mystery.bin".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_task_failure_is_retryable() {
        let err = ConvertError::Pool(PoolError::Task {
            message: "encode blew up".to_string(),
        });
        assert!(err.is_retryable());
    }

    #[test]
    fn test_terminated_pool_is_not_retryable() {
        let err = ConvertError::Pool(PoolError::Terminated);
        assert!(!err.is_retryable());
    }
}
