//! Conversion service implementation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::codec::{EncodeOptions, TaskProgress, TaskRequest};
use crate::media::{output_filename, MediaFormat};
use crate::metrics;
use crate::pool::WorkerPool;

use super::error::ConvertError;
use super::types::{BatchProgress, ConversionResult, SourceFile};

/// Converts in-memory files through the worker pool.
///
/// The service holds no mutable state of its own; it is cheap to share via
/// `Arc` and safe to call from any number of tasks concurrently.
pub struct ConversionService {
    pool: Arc<WorkerPool>,
}

impl ConversionService {
    /// Creates a service on top of an initialized pool.
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self { pool }
    }

    /// The pool backing this service.
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Converts one file to the target format.
    ///
    /// The source format is sniffed from magic bytes; a buffer matching no
    /// known signature fails with [`ConvertError::FormatDetection`] before
    /// any task is submitted. Progress ticks, when a sender is supplied, are
    /// forwarded verbatim from the execution unit; the service synthesizes
    /// none of its own.
    pub async fn convert(
        &self,
        file: &SourceFile,
        target: MediaFormat,
        options: EncodeOptions,
        progress: Option<mpsc::Sender<TaskProgress>>,
    ) -> Result<ConversionResult, ConvertError> {
        let source_format = MediaFormat::detect(&file.data).ok_or_else(|| {
            ConvertError::FormatDetection {
                filename: file.name.clone(),
            }
        })?;

        if !source_format.is_image() {
            return Err(ConvertError::UnsupportedFormat {
                format: source_format,
            });
        }
        if !target.is_image() {
            return Err(ConvertError::UnsupportedFormat { format: target });
        }

        debug!(
            "Converting '{}' {:?} -> {:?}",
            file.name, source_format, target
        );

        let original_size_bytes = file.size_bytes();
        let timer = metrics::CONVERSION_DURATION
            .with_label_values(&[])
            .start_timer();

        // The request owns a copy of the bytes; the copy moves into the pool
        // and is gone, while the caller's file stays intact for retries.
        let request =
            TaskRequest::convert(file.data.as_ref().clone(), source_format, target, options);

        let outcome = match progress {
            Some(tx) => self.pool.execute_with_progress(request, tx).await,
            None => self.pool.execute(request).await,
        };

        match outcome {
            Ok(task) => {
                timer.observe_duration();
                let converted_size_bytes = task.payload.len() as u64;
                metrics::CONVERSIONS_TOTAL.with_label_values(&["success"]).inc();
                metrics::BYTES_IN.inc_by(original_size_bytes);
                metrics::BYTES_OUT.inc_by(converted_size_bytes);

                Ok(ConversionResult {
                    data: Arc::new(task.payload),
                    format: target,
                    mime_type: target.mime_type().to_string(),
                    filename: output_filename(&file.name, target),
                    dimensions: task.dimensions,
                    original_size_bytes,
                    converted_size_bytes,
                })
            }
            Err(e) => {
                timer.stop_and_discard();
                metrics::CONVERSIONS_TOTAL.with_label_values(&["failed"]).inc();
                Err(ConvertError::Pool(e))
            }
        }
    }

    /// Converts files one at a time, reporting coarse per-file progress.
    ///
    /// Stops at the first failure.
    pub async fn convert_sequential(
        &self,
        files: &[SourceFile],
        target: MediaFormat,
        options: EncodeOptions,
        progress: Option<mpsc::Sender<BatchProgress>>,
    ) -> Result<Vec<ConversionResult>, ConvertError> {
        let total = files.len();
        let mut results = Vec::with_capacity(total);

        for (index, file) in files.iter().enumerate() {
            if let Some(tx) = &progress {
                let _ = tx
                    .send(BatchProgress {
                        completed: index,
                        total,
                        current_file: Some(file.name.clone()),
                    })
                    .await;
            }
            results.push(self.convert(file, target, options.clone(), None).await?);
        }

        if let Some(tx) = &progress {
            let _ = tx
                .send(BatchProgress {
                    completed: total,
                    total,
                    current_file: None,
                })
                .await;
        }

        Ok(results)
    }

    /// Fires all conversions concurrently and reports completion counts.
    ///
    /// Throughput is bounded entirely by the pool's unit count; this helper
    /// does not throttle. The whole batch fails fast on the first error,
    /// and per-item resilience belongs to the batch manager.
    pub async fn convert_parallel(
        &self,
        files: &[SourceFile],
        target: MediaFormat,
        options: EncodeOptions,
        progress: Option<mpsc::Sender<BatchProgress>>,
    ) -> Result<Vec<ConversionResult>, ConvertError> {
        let total = files.len();
        let completed = Arc::new(AtomicUsize::new(0));

        let conversions = files.iter().map(|file| {
            let completed = Arc::clone(&completed);
            let progress = progress.clone();
            let options = options.clone();
            async move {
                let result = self.convert(file, target, options, None).await?;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(tx) = &progress {
                    let _ = tx
                        .send(BatchProgress {
                            completed: done,
                            total,
                            current_file: Some(file.name.clone()),
                        })
                        .await;
                }
                Ok::<_, ConvertError>(result)
            }
        });

        futures::future::try_join_all(conversions).await
    }
}
