//! Execution unit implementation.
//!
//! Each unit is a long-lived tokio task that pulls one request at a time
//! from its private channel, drives the codec engine, and reports replies
//! back to the dispatcher over a shared event channel.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::codec::{CodecEngine, CodecError, TaskProgress, TaskReply, TaskRequest};

/// An event from an execution unit to the dispatcher.
#[derive(Debug)]
pub(crate) struct WorkerEvent {
    /// Unit that produced the event.
    pub worker_id: usize,
    /// The reply payload.
    pub reply: TaskReply,
}

/// Dispatcher-side handle to one execution unit.
pub(crate) struct WorkerHandle {
    /// Single-slot request channel. The unit is only handed a task when the
    /// dispatcher believes it idle, so sends never queue up.
    pub tx: mpsc::Sender<TaskRequest>,
    pub join: JoinHandle<()>,
}

/// Spawns one execution unit.
///
/// The unit validates the engine and signals readiness through `ready_tx`
/// before it starts accepting work; a validation failure is reported on the
/// same channel and the unit exits.
pub(crate) fn spawn_worker(
    id: usize,
    engine: Arc<dyn CodecEngine>,
    event_tx: mpsc::Sender<WorkerEvent>,
    ready_tx: oneshot::Sender<Result<(), CodecError>>,
) -> WorkerHandle {
    let (task_tx, mut task_rx) = mpsc::channel::<TaskRequest>(1);

    let join = tokio::spawn(async move {
        let ready = engine.validate().await;
        let failed = ready.is_err();
        let _ = ready_tx.send(ready);
        if failed {
            return;
        }
        debug!("Execution unit {} ready ({})", id, engine.name());

        while let Some(request) = task_rx.recv().await {
            let task_id = request.task_id;

            // Bridge engine progress ticks into dispatcher events.
            let (progress_tx, mut progress_rx) = mpsc::channel::<TaskProgress>(32);
            let forward_tx = event_tx.clone();
            let forwarder = tokio::spawn(async move {
                while let Some(tick) = progress_rx.recv().await {
                    let _ = forward_tx
                        .send(WorkerEvent {
                            worker_id: id,
                            reply: TaskReply::Progress {
                                task_id,
                                percent: tick.percent,
                                stage: tick.stage,
                            },
                        })
                        .await;
                }
            });

            let result = engine.run(request, Some(progress_tx)).await;
            // The engine dropped its sender; wait for queued ticks to flush
            // so progress never arrives after the completion reply.
            let _ = forwarder.await;

            let reply = match result {
                Ok(output) => TaskReply::Success {
                    task_id,
                    payload: output.payload,
                    dimensions: output.dimensions,
                },
                Err(e) => TaskReply::Error {
                    task_id,
                    message: e.to_string(),
                },
            };

            if event_tx
                .send(WorkerEvent {
                    worker_id: id,
                    reply,
                })
                .await
                .is_err()
            {
                // Dispatcher is gone; the pool is shutting down.
                break;
            }
        }

        debug!("Execution unit {} stopped", id);
    });

    WorkerHandle { tx: task_tx, join }
}
