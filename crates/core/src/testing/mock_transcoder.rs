//! Mock transcoding engine for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use crate::transcode::{TranscodeEngine, TranscodeError, TranscodeJob, TranscodeProgress};

/// Mock implementation of the [`TranscodeEngine`] trait.
///
/// Records submitted jobs, supports one-shot error injection and emits
/// fractional progress during simulated work.
#[derive(Debug)]
pub struct MockTranscoder {
    /// Jobs submitted so far.
    jobs: Arc<RwLock<Vec<TranscodeJob>>>,
    /// If set, the next job fails with this message.
    next_error: Arc<RwLock<Option<String>>>,
    /// Simulated transcode duration in milliseconds.
    duration_ms: Arc<RwLock<u64>>,
    /// Size of the fabricated output.
    output_size: Arc<RwLock<usize>>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    /// Create a new mock transcoder.
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            duration_ms: Arc::new(RwLock::new(0)),
            output_size: Arc::new(RwLock::new(4096)),
        }
    }

    /// Configure the next job to fail with the given reason.
    pub async fn set_next_error(&self, reason: impl Into<String>) {
        *self.next_error.write().await = Some(reason.into());
    }

    /// Set the simulated transcode duration.
    pub async fn set_duration(&self, duration: Duration) {
        *self.duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Jobs submitted so far.
    pub async fn recorded_jobs(&self) -> Vec<TranscodeJob> {
        self.jobs.read().await.clone()
    }

    async fn run(&self, job: TranscodeJob) -> Result<Vec<u8>, TranscodeError> {
        self.jobs.write().await.push(job);

        if let Some(reason) = self.next_error.write().await.take() {
            return Err(TranscodeError::engine_failed(reason, None));
        }

        let duration_ms = *self.duration_ms.read().await;
        if duration_ms > 0 {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }

        let size = *self.output_size.read().await;
        Ok(vec![0xCD; size])
    }
}

#[async_trait]
impl TranscodeEngine for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        Ok(())
    }

    async fn transcode(&self, job: TranscodeJob) -> Result<Vec<u8>, TranscodeError> {
        self.run(job).await
    }

    async fn transcode_with_progress(
        &self,
        job: TranscodeJob,
        progress_tx: mpsc::Sender<TranscodeProgress>,
    ) -> Result<Vec<u8>, TranscodeError> {
        let duration_ms = *self.duration_ms.read().await;
        let steps = 4u64;
        for step in 1..=steps {
            if duration_ms > 0 {
                tokio::time::sleep(Duration::from_millis(duration_ms / steps)).await;
            }
            let _ = progress_tx
                .send(TranscodeProgress {
                    fraction: step as f32 / steps as f32,
                    elapsed_secs: (duration_ms * step / steps) as f64 / 1000.0,
                })
                .await;
        }
        self.run(job).await
    }
}
