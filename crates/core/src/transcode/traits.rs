//! Trait definitions for the transcoding boundary.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::TranscodeError;
use super::types::{TranscodeJob, TranscodeProgress};

/// A video/audio transcoding engine.
///
/// Implementations materialize the job's payload in an internal virtual
/// file system, run the explicit argument list against it and return the
/// encoded output bytes.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Returns the name of this engine implementation.
    fn name(&self) -> &str;

    /// Validates that the engine is loaded and ready.
    async fn validate(&self) -> Result<(), TranscodeError>;

    /// Runs one transcode job to completion.
    async fn transcode(&self, job: TranscodeJob) -> Result<Vec<u8>, TranscodeError>;

    /// Like [`TranscodeEngine::transcode`], emitting fractional progress.
    ///
    /// If the sender is dropped, transcoding continues without reporting.
    async fn transcode_with_progress(
        &self,
        job: TranscodeJob,
        progress_tx: mpsc::Sender<TranscodeProgress>,
    ) -> Result<Vec<u8>, TranscodeError>;
}
