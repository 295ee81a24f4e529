//! Worker pool implementation.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::codec::{CodecEngine, TaskProgress, TaskReply, TaskRequest};
use crate::metrics;

use super::error::PoolError;
use super::types::{PoolConfig, PoolStats, PoolStatus, TaskResult};
use super::worker::{spawn_worker, WorkerEvent, WorkerHandle};

/// Capacity of the dispatcher command channel. Submissions beyond this apply
/// backpressure on `execute` callers; the real FIFO queue lives inside the
/// dispatcher and is unbounded.
const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// A task waiting for (or bound to) an execution unit.
struct PendingTask {
    request: TaskRequest,
    progress: Option<mpsc::Sender<TaskProgress>>,
    reply: oneshot::Sender<Result<TaskResult, PoolError>>,
}

/// Dispatcher-side record of a task bound to a unit.
struct InFlightTask {
    reply: oneshot::Sender<Result<TaskResult, PoolError>>,
    progress: Option<mpsc::Sender<TaskProgress>>,
}

enum PoolCommand {
    Submit(PendingTask),
    Terminate,
}

/// A bounded pool of execution units for codec tasks.
///
/// Construct with [`WorkerPool::new`], bring up with
/// [`WorkerPool::initialize`], and share via `Arc`. The pool is an explicitly
/// constructed, dependency-injected instance: independent pools can coexist
/// and each can be torn down cleanly with [`WorkerPool::terminate`].
pub struct WorkerPool {
    config: PoolConfig,
    engine: Arc<dyn CodecEngine>,
    cmd_tx: RwLock<Option<mpsc::Sender<PoolCommand>>>,
    stats: Arc<PoolStats>,
    capacity: AtomicUsize,
}

impl WorkerPool {
    /// Creates a pool handle. No units are started until `initialize`.
    pub fn new(config: PoolConfig, engine: Arc<dyn CodecEngine>) -> Self {
        Self {
            config,
            engine,
            cmd_tx: RwLock::new(None),
            stats: Arc::new(PoolStats::default()),
            capacity: AtomicUsize::new(0),
        }
    }

    /// Spins up the execution units and the dispatcher.
    ///
    /// Starts `min(requested, available_parallelism)` units and resolves only
    /// once every unit has signaled readiness. If any unit fails to start the
    /// whole pool is torn down and an error is returned; there are no
    /// partial pools.
    pub async fn initialize(&self) -> Result<(), PoolError> {
        let mut guard = self.cmd_tx.write().await;
        if guard.is_some() {
            return Err(PoolError::AlreadyInitialized);
        }

        let worker_count = self.config.effective_workers();
        info!(
            "Initializing worker pool: {} execution units ({})",
            worker_count,
            self.engine.name()
        );

        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>(worker_count * 4);
        let mut workers = Vec::with_capacity(worker_count);
        let mut ready_rxs = Vec::with_capacity(worker_count);

        for id in 0..worker_count {
            let (ready_tx, ready_rx) = oneshot::channel();
            workers.push(spawn_worker(
                id,
                Arc::clone(&self.engine),
                event_tx.clone(),
                ready_tx,
            ));
            ready_rxs.push(ready_rx);
        }

        for (id, ready_rx) in ready_rxs.into_iter().enumerate() {
            let ready = match ready_rx.await {
                Ok(result) => result,
                Err(_) => {
                    abort_all(&workers);
                    return Err(PoolError::spawn_failed(format!(
                        "execution unit {id} exited before signaling readiness"
                    )));
                }
            };
            if let Err(e) = ready {
                abort_all(&workers);
                return Err(PoolError::spawn_failed(format!(
                    "execution unit {id} failed validation: {e}"
                )));
            }
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let dispatcher = Dispatcher {
            workers,
            idle: (0..worker_count).rev().collect(),
            pending: VecDeque::new(),
            in_flight: HashMap::new(),
            stats: Arc::clone(&self.stats),
        };
        tokio::spawn(dispatcher.run(cmd_rx, event_rx));

        self.capacity.store(worker_count, Ordering::Relaxed);
        *guard = Some(cmd_tx);
        Ok(())
    }

    /// Submits a task and waits for its result.
    ///
    /// Never panics: every failure path is an `Err`. The request's payload
    /// moves into the pool and, from there, into an execution unit.
    pub async fn execute(&self, request: TaskRequest) -> Result<TaskResult, PoolError> {
        self.submit(request, None).await
    }

    /// Like [`WorkerPool::execute`], forwarding the unit's progress ticks.
    pub async fn execute_with_progress(
        &self,
        request: TaskRequest,
        progress: mpsc::Sender<TaskProgress>,
    ) -> Result<TaskResult, PoolError> {
        self.submit(request, Some(progress)).await
    }

    async fn submit(
        &self,
        request: TaskRequest,
        progress: Option<mpsc::Sender<TaskProgress>>,
    ) -> Result<TaskResult, PoolError> {
        let cmd_tx = {
            let guard = self.cmd_tx.read().await;
            guard.clone().ok_or(PoolError::NotInitialized)?
        };

        metrics::TASKS_SUBMITTED.inc();
        self.stats.queued.fetch_add(1, Ordering::Relaxed);

        let (reply_tx, reply_rx) = oneshot::channel();
        let pending = PendingTask {
            request,
            progress,
            reply: reply_tx,
        };

        if cmd_tx.send(PoolCommand::Submit(pending)).await.is_err() {
            self.stats.queued.fetch_sub(1, Ordering::Relaxed);
            return Err(PoolError::Terminated);
        }

        // A dropped reply sender means the pool was torn down while this
        // task was still pending.
        reply_rx.await.map_err(|_| PoolError::Terminated)?
    }

    /// Forcibly stops every unit and abandons all queued and in-flight tasks.
    ///
    /// Callers still waiting on `execute` observe [`PoolError::Terminated`].
    pub async fn terminate(&self) {
        let cmd_tx = {
            let mut guard = self.cmd_tx.write().await;
            guard.take()
        };
        if let Some(tx) = cmd_tx {
            let _ = tx.send(PoolCommand::Terminate).await;
            info!("Worker pool terminated");
        }
    }

    /// Whether `initialize` has completed successfully.
    pub async fn is_initialized(&self) -> bool {
        self.cmd_tx.read().await.is_some()
    }

    /// Number of execution units (0 before initialization).
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Point-in-time pool status.
    pub fn status(&self) -> PoolStatus {
        self.stats.to_status(self.capacity())
    }
}

fn abort_all(workers: &[WorkerHandle]) {
    for worker in workers {
        worker.join.abort();
    }
}

/// Owns the scheduling state: idle units, the FIFO queue of not-yet-bound
/// tasks, and the task-id → caller map for in-flight work.
struct Dispatcher {
    workers: Vec<WorkerHandle>,
    idle: Vec<usize>,
    pending: VecDeque<PendingTask>,
    in_flight: HashMap<Uuid, InFlightTask>,
    stats: Arc<PoolStats>,
}

impl Dispatcher {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<PoolCommand>,
        mut event_rx: mpsc::Receiver<WorkerEvent>,
    ) {
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(PoolCommand::Submit(task)) => {
                        self.pending.push_back(task);
                        self.dispatch().await;
                    }
                    Some(PoolCommand::Terminate) | None => break,
                },
                Some(event) = event_rx.recv() => {
                    self.handle_event(event).await;
                }
            }
        }
        self.shutdown();
    }

    /// Binds queued tasks to idle units until one of the two runs out.
    async fn dispatch(&mut self) {
        while !self.pending.is_empty() && !self.idle.is_empty() {
            let Some(worker_id) = self.idle.pop() else { break };
            let Some(task) = self.pending.pop_front() else {
                self.idle.push(worker_id);
                break;
            };

            let PendingTask {
                request,
                progress,
                reply,
            } = task;
            let task_id = request.task_id;

            match self.workers[worker_id].tx.send(request).await {
                Ok(()) => {
                    self.stats.queued.fetch_sub(1, Ordering::Relaxed);
                    self.stats.active.fetch_add(1, Ordering::Relaxed);
                    self.in_flight
                        .insert(task_id, InFlightTask { reply, progress });
                }
                Err(_) => {
                    // The unit's task is gone. Surface the crash instead of
                    // leaving the caller pending forever; the unit is not
                    // returned to the idle set and is never re-spawned.
                    error!(
                        "Execution unit {} crashed; failing task {}",
                        worker_id, task_id
                    );
                    self.stats.queued.fetch_sub(1, Ordering::Relaxed);
                    self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                    let _ = reply.send(Err(PoolError::UnitCrashed { unit: worker_id }));
                }
            }
        }
    }

    async fn handle_event(&mut self, event: WorkerEvent) {
        match event.reply {
            TaskReply::Progress {
                task_id,
                percent,
                stage,
            } => {
                if let Some(entry) = self.in_flight.get(&task_id) {
                    if let Some(tx) = &entry.progress {
                        // Best-effort: a slow consumer drops ticks, it does
                        // not stall the dispatcher.
                        let _ = tx.try_send(TaskProgress { percent, stage });
                    }
                }
            }
            TaskReply::Success {
                task_id,
                payload,
                dimensions,
            } => {
                let Some(entry) = self.in_flight.remove(&task_id) else {
                    warn!("Reply for unknown task {}", task_id);
                    return;
                };
                self.stats.active.fetch_sub(1, Ordering::Relaxed);
                self.stats.total_processed.fetch_add(1, Ordering::Relaxed);
                metrics::TASKS_TOTAL.with_label_values(&["success"]).inc();
                let _ = entry.reply.send(Ok(TaskResult {
                    payload,
                    dimensions,
                }));
                self.idle.push(event.worker_id);
                self.dispatch().await;
            }
            TaskReply::Error { task_id, message } => {
                let Some(entry) = self.in_flight.remove(&task_id) else {
                    warn!("Error reply for unknown task {}", task_id);
                    return;
                };
                self.stats.active.fetch_sub(1, Ordering::Relaxed);
                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                metrics::TASKS_TOTAL.with_label_values(&["error"]).inc();
                debug!("Task {} failed: {}", task_id, message);
                let _ = entry.reply.send(Err(PoolError::Task { message }));
                self.idle.push(event.worker_id);
                self.dispatch().await;
            }
        }
    }

    /// Tears down all units and abandons outstanding work. Dropping the
    /// pending and in-flight reply senders resolves their callers with
    /// `PoolError::Terminated`.
    fn shutdown(self) {
        for worker in &self.workers {
            worker.join.abort();
        }
        self.stats.queued.store(0, Ordering::Relaxed);
        self.stats.active.store(0, Ordering::Relaxed);
        debug!(
            "Dispatcher shut down: {} queued and {} in-flight tasks abandoned",
            self.pending.len(),
            self.in_flight.len()
        );
    }
}
