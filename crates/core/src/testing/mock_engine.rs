//! Mock codec engine for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::codec::{
    CodecEngine, CodecError, EncodeOptions, OperationKind, TaskOutput, TaskProgress, TaskRequest,
};
use crate::media::{Dimensions, MediaFormat};

/// A recorded task for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedTask {
    /// Task id from the request.
    pub task_id: Uuid,
    /// Requested operation.
    pub operation: OperationKind,
    /// Detected source format.
    pub source_format: MediaFormat,
    /// Requested target format.
    pub target_format: Option<MediaFormat>,
    /// Options carried by the request.
    pub options: EncodeOptions,
    /// Payload size at submission.
    pub payload_len: usize,
    /// When the engine started the task.
    pub started_at: Instant,
    /// Whether the task succeeded.
    pub success: bool,
}

/// Mock implementation of the [`CodecEngine`] trait.
///
/// Provides controllable behavior for testing:
/// - Track tasks (and their start times) for assertions
/// - Fail the next N tasks, then recover
/// - Fail unit validation to abort pool startup
/// - Simulate task duration and progress updates
#[derive(Debug)]
pub struct MockEngine {
    /// Tasks that started, in start order.
    starts: Arc<RwLock<Vec<(Uuid, Instant)>>>,
    /// Tasks that settled, in completion order.
    tasks: Arc<RwLock<Vec<RecordedTask>>>,
    /// Remaining injected failures.
    fail_remaining: Arc<RwLock<u32>>,
    /// Validation failure, if configured.
    validate_error: Arc<RwLock<Option<String>>>,
    /// Simulated task duration in milliseconds.
    task_duration_ms: Arc<RwLock<u64>>,
    /// Whether to emit progress ticks while a task runs.
    send_progress: Arc<RwLock<bool>>,
    /// Size of the fabricated output payload.
    output_size: Arc<RwLock<usize>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Create a new mock engine.
    pub fn new() -> Self {
        Self {
            starts: Arc::new(RwLock::new(Vec::new())),
            tasks: Arc::new(RwLock::new(Vec::new())),
            fail_remaining: Arc::new(RwLock::new(0)),
            validate_error: Arc::new(RwLock::new(None)),
            task_duration_ms: Arc::new(RwLock::new(0)),
            send_progress: Arc::new(RwLock::new(true)),
            output_size: Arc::new(RwLock::new(512)),
        }
    }

    /// Fail the next `count` tasks with an injected codec error.
    pub async fn fail_times(&self, count: u32) {
        *self.fail_remaining.write().await = count;
    }

    /// Make every unit validation fail with the given reason.
    pub async fn set_validate_error(&self, reason: impl Into<String>) {
        *self.validate_error.write().await = Some(reason.into());
    }

    /// Set the simulated task duration.
    pub async fn set_task_duration(&self, duration: Duration) {
        *self.task_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Enable or disable progress ticks.
    pub async fn set_send_progress(&self, send: bool) {
        *self.send_progress.write().await = send;
    }

    /// Set the fabricated output payload size.
    pub async fn set_output_size(&self, size: usize) {
        *self.output_size.write().await = size;
    }

    /// All settled tasks, in completion order.
    pub async fn recorded_tasks(&self) -> Vec<RecordedTask> {
        self.tasks.read().await.clone()
    }

    /// Number of settled tasks.
    pub async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Task ids in the order the engine started them.
    pub async fn start_order(&self) -> Vec<Uuid> {
        self.starts.read().await.iter().map(|(id, _)| *id).collect()
    }

    /// Number of tasks started so far (settled or not).
    pub async fn started_count(&self) -> usize {
        self.starts.read().await.len()
    }

    /// Clear all recordings.
    pub async fn clear_recorded(&self) {
        self.starts.write().await.clear();
        self.tasks.write().await.clear();
    }

    /// Consume one injected failure, if any remain.
    async fn take_failure(&self) -> bool {
        let mut remaining = self.fail_remaining.write().await;
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl CodecEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn validate(&self) -> Result<(), CodecError> {
        if let Some(reason) = self.validate_error.read().await.clone() {
            return Err(CodecError::not_ready(reason));
        }
        Ok(())
    }

    async fn run(
        &self,
        request: TaskRequest,
        progress: Option<mpsc::Sender<TaskProgress>>,
    ) -> Result<TaskOutput, CodecError> {
        let started_at = Instant::now();
        self.starts.write().await.push((request.task_id, started_at));

        let duration_ms = *self.task_duration_ms.read().await;
        let send_progress = *self.send_progress.read().await;

        if send_progress {
            if let Some(tx) = &progress {
                let _ = tx
                    .send(TaskProgress {
                        percent: 25,
                        stage: "decode".to_string(),
                    })
                    .await;
            }
        }

        if duration_ms > 0 {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }

        if send_progress {
            if let Some(tx) = &progress {
                let _ = tx
                    .send(TaskProgress {
                        percent: 75,
                        stage: "encode".to_string(),
                    })
                    .await;
            }
        }

        let failed = self.take_failure().await;
        self.tasks.write().await.push(RecordedTask {
            task_id: request.task_id,
            operation: request.operation,
            source_format: request.source_format,
            target_format: request.target_format,
            options: request.options.clone(),
            payload_len: request.payload.len(),
            started_at,
            success: !failed,
        });

        if failed {
            return Err(CodecError::encode_failed("injected failure"));
        }

        let output_size = *self.output_size.read().await;
        Ok(TaskOutput {
            payload: vec![0xAB; output_size],
            dimensions: Some(Dimensions {
                width: 64,
                height: 48,
            }),
        })
    }
}
