//! Batch manager implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use chrono::Utc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec::{EncodeOptions, TaskProgress};
use crate::convert::{ConversionResult, ConversionService, ConvertError, SourceFile};
use crate::media::{format_size, probe_dimensions, MediaFormat};
use crate::metrics;
use crate::transform::{needs_resize, resize_image, ResizeConfig, TransformError};

use super::config::BatchConfig;
use super::error::BatchError;
use super::observer::{ObserverRegistry, SubscriptionId};
use super::stats::BatchStatistics;
use super::types::{BatchState, ItemStatus, ProcessingItem};

/// Synthetic progress milestones reported by the resize sub-step, distinct
/// from the codec's own progress reporting.
const RESIZE_START_PROGRESS: u8 = 10;
const RESIZE_DONE_PROGRESS: u8 = 20;

/// The batch processing manager.
///
/// An explicitly constructed, dependency-injected instance: callers create
/// one per application context (or per test) and share it via `clone`. All
/// item state lives behind the manager; nothing else mutates it.
#[derive(Clone)]
pub struct BatchManager {
    shared: Arc<BatchShared>,
}

struct BatchShared {
    config: BatchConfig,
    service: Arc<ConversionService>,
    items: RwLock<HashMap<String, ProcessingItem>>,
    observers: ObserverRegistry,
    is_processing: AtomicBool,
    /// Explicit item-concurrency bound. Sized to the pool unless the config
    /// overrides it, so the bound no longer changes silently with pool size.
    semaphore: Arc<Semaphore>,
}

/// One failed processing attempt.
enum AttemptError {
    Transform(TransformError),
    Convert(ConvertError),
    /// The item disappeared from the map mid-flight (e.g. `clear`).
    Missing,
}

impl AttemptError {
    /// Transform failures get the same retry treatment as conversion
    /// failures; only errors the service marks terminal skip the budget.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transform(_) => true,
            Self::Convert(e) => e.is_retryable(),
            Self::Missing => false,
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transform(e) => write!(f, "{e}"),
            Self::Convert(e) => write!(f, "{e}"),
            Self::Missing => write!(f, "item no longer tracked"),
        }
    }
}

impl BatchManager {
    /// Creates a manager over a conversion service.
    ///
    /// The item-concurrency semaphore is sized to the service's pool unless
    /// `config.max_parallel_items` overrides it.
    pub fn new(config: BatchConfig, service: Arc<ConversionService>) -> Self {
        let permits = config
            .max_parallel_items
            .unwrap_or_else(|| service.pool().capacity())
            .max(1);
        debug!(
            "Batch manager created: max_retries={}, max_parallel_items={}",
            config.max_retries, permits
        );

        Self {
            shared: Arc::new(BatchShared {
                config,
                service,
                items: RwLock::new(HashMap::new()),
                observers: ObserverRegistry::default(),
                is_processing: AtomicBool::new(false),
                semaphore: Arc::new(Semaphore::new(permits)),
            }),
        }
    }

    // =========================================================================
    // Subscription
    // =========================================================================

    /// Registers a state-change callback.
    ///
    /// The callback runs synchronously on the mutating task, at least once
    /// per state change with no upper frequency bound; expect one call per
    /// progress tick during active batches.
    pub fn subscribe(
        &self,
        callback: impl Fn(&BatchState) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.shared.observers.subscribe(callback)
    }

    /// Removes a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.observers.unsubscribe(id)
    }

    // =========================================================================
    // Item intake and queries
    // =========================================================================

    /// Creates one `Queued` item per file and returns the generated ids.
    ///
    /// Returns synchronously; dimension probing for resize defaults runs in
    /// the background and fills in `original_dimensions` (and a default
    /// resize config) when ready. Callers must not assume dimensions are
    /// populated when this returns. Must be called within a tokio runtime.
    pub fn add_files(&self, files: Vec<SourceFile>) -> Vec<String> {
        let mut ids = Vec::with_capacity(files.len());
        {
            let mut items = self.shared.items_write();
            for file in files {
                let id = Uuid::new_v4().to_string();
                debug!(
                    "Queued item {} ({}, {})",
                    id,
                    file.name,
                    format_size(file.size_bytes())
                );
                items.insert(id.clone(), ProcessingItem::new(id.clone(), file));
                ids.push(id);
            }
        }
        BatchShared::notify(&self.shared);

        for id in &ids {
            self.spawn_dimension_probe(id.clone());
        }

        ids
    }

    fn spawn_dimension_probe(&self, id: String) {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let data = {
                let items = shared.items_read();
                match items.get(&id) {
                    Some(item) => Arc::clone(&item.source.data),
                    None => return,
                }
            };

            let probed = tokio::task::spawn_blocking(move || probe_dimensions(&data)).await;
            match probed {
                Ok(Ok(dims)) => {
                    BatchShared::update_item(&shared, &id, |item| {
                        item.original_dimensions = Some(dims);
                        // Resize config stays frozen once the item is
                        // terminal; only seed it while still mutable.
                        if item.resize.is_none() && !item.status.is_terminal() {
                            item.resize = Some(ResizeConfig::original(dims));
                        }
                    });
                }
                Ok(Err(e)) => debug!("Dimension probe failed for item {}: {}", id, e),
                Err(e) => warn!("Dimension probe panicked for item {}: {}", id, e),
            }
        });
    }

    /// Snapshot of one item.
    pub fn item(&self, id: &str) -> Option<ProcessingItem> {
        self.shared.items_read().get(id).cloned()
    }

    /// Ids of all tracked items.
    pub fn item_ids(&self) -> Vec<String> {
        self.shared.items_read().keys().cloned().collect()
    }

    /// Derived batch state snapshot.
    pub fn state(&self) -> BatchState {
        BatchShared::derive_state(&self.shared)
    }

    /// Derived statistics over completed items.
    pub fn statistics(&self) -> BatchStatistics {
        BatchStatistics::compute(self.shared.items_read().values())
    }

    // =========================================================================
    // Batch processing
    // =========================================================================

    /// Processes every queued item, converting to `target`.
    ///
    /// Guarded: fails fast with [`BatchError::AlreadyRunning`] when a batch
    /// is active rather than queuing a second one. Items run concurrently up
    /// to the semaphore bound; each item's failures are absorbed into its
    /// own state, so this only returns an error for the guard.
    pub async fn process_batch(
        &self,
        target: MediaFormat,
        options: EncodeOptions,
    ) -> Result<(), BatchError> {
        if self.shared.is_processing.swap(true, Ordering::SeqCst) {
            return Err(BatchError::AlreadyRunning);
        }
        metrics::BATCHES_STARTED.inc();
        BatchShared::notify(&self.shared);

        let ids: Vec<String> = {
            let items = self.shared.items_read();
            items
                .values()
                .filter(|item| item.status == ItemStatus::Queued)
                .map(|item| item.id.clone())
                .collect()
        };
        info!("Processing batch: {} items -> {:?}", ids.len(), target);

        let mut handles = Vec::with_capacity(ids.len());
        for id in ids {
            let shared = Arc::clone(&self.shared);
            let options = options.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match Arc::clone(&shared.semaphore).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                BatchShared::process_item(&shared, &id, target, options).await;
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Item processing task panicked: {}", e);
            }
        }

        self.shared.is_processing.store(false, Ordering::SeqCst);
        BatchShared::notify(&self.shared);
        Ok(())
    }

    /// Re-processes a failed item with a fresh retry budget.
    ///
    /// Valid only from `Error`: the item is reset to `Queued` (clearing the
    /// prior failure) and processed immediately.
    pub async fn retry_item(
        &self,
        id: &str,
        target: MediaFormat,
        options: EncodeOptions,
    ) -> Result<(), BatchError> {
        {
            let mut items = self.shared.items_write();
            let item = items.get_mut(id).ok_or_else(|| BatchError::ItemNotFound {
                id: id.to_string(),
            })?;
            if item.status != ItemStatus::Error {
                return Err(BatchError::InvalidStatus {
                    id: id.to_string(),
                    expected: ItemStatus::Error.as_str(),
                    actual: item.status.as_str(),
                });
            }
            item.status = ItemStatus::Queued;
            item.error = None;
            item.result = None;
            item.progress = 0;
            item.started_at = None;
            item.finished_at = None;
            item.duration_ms = None;
        }
        BatchShared::notify(&self.shared);

        let _permit = match Arc::clone(&self.shared.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return Ok(()),
        };
        BatchShared::process_item(&self.shared, id, target, options).await;
        Ok(())
    }

    // =========================================================================
    // Item mutation
    // =========================================================================

    /// Removes a `Queued` item outright. A no-op (returning `false`) for any
    /// other status; in-flight items cannot be cancelled.
    pub fn cancel_item(&self, id: &str) -> bool {
        let removed = {
            let mut items = self.shared.items_write();
            match items.get(id) {
                Some(item) if item.status == ItemStatus::Queued => {
                    items.remove(id);
                    true
                }
                _ => false,
            }
        };
        if removed {
            info!("Cancelled item {}", id);
            metrics::ITEMS_TOTAL.with_label_values(&["cancelled"]).inc();
            BatchShared::notify(&self.shared);
        }
        removed
    }

    /// Replaces the resize config of a `Queued` or `Processing` item.
    /// No-op (returning `false`) once the item is terminal.
    pub fn update_item_resize(&self, id: &str, config: ResizeConfig) -> bool {
        let updated = {
            let mut items = self.shared.items_write();
            match items.get_mut(id) {
                Some(item) if !item.status.is_terminal() => {
                    item.resize = Some(config);
                    true
                }
                _ => false,
            }
        };
        if updated {
            BatchShared::notify(&self.shared);
        }
        updated
    }

    /// Applies a resize config to every non-terminal item. Returns how many
    /// items were updated; fires a single notification for the bulk change.
    pub fn apply_resize_to_all(&self, config: &ResizeConfig) -> usize {
        let updated = {
            let mut items = self.shared.items_write();
            let mut count = 0;
            for item in items.values_mut() {
                if !item.status.is_terminal() {
                    item.resize = Some(config.clone());
                    count += 1;
                }
            }
            count
        };
        if updated > 0 {
            BatchShared::notify(&self.shared);
        }
        updated
    }

    /// Removes every item.
    pub fn clear(&self) {
        {
            let mut items = self.shared.items_write();
            items.clear();
        }
        BatchShared::notify(&self.shared);
    }

    /// Removes `Complete` items only. Returns how many were removed.
    pub fn clear_completed(&self) -> usize {
        let removed = {
            let mut items = self.shared.items_write();
            let before = items.len();
            items.retain(|_, item| item.status != ItemStatus::Complete);
            before - items.len()
        };
        if removed > 0 {
            BatchShared::notify(&self.shared);
        }
        removed
    }
}

impl BatchShared {
    fn items_read(&self) -> RwLockReadGuard<'_, HashMap<String, ProcessingItem>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn items_write(&self) -> RwLockWriteGuard<'_, HashMap<String, ProcessingItem>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn derive_state(shared: &Arc<Self>) -> BatchState {
        let items = shared.items_read();
        BatchState::derive(&items, shared.is_processing.load(Ordering::SeqCst))
    }

    fn notify(shared: &Arc<Self>) {
        let state = Self::derive_state(shared);
        shared.observers.notify(&state);
    }

    /// The single mutation primitive: applies a patch to one item and fires
    /// exactly one notification. Missing items are ignored silently.
    fn update_item(shared: &Arc<Self>, id: &str, patch: impl FnOnce(&mut ProcessingItem)) {
        {
            let mut items = shared.items_write();
            match items.get_mut(id) {
                Some(item) => patch(item),
                None => return,
            }
        }
        Self::notify(shared);
    }

    /// Raises an item's progress. Enforces monotonicity: a tick below the
    /// current value is dropped, and ticks only apply while `Processing`.
    fn set_progress(shared: &Arc<Self>, id: &str, percent: u8) {
        let stale = {
            let items = shared.items_read();
            match items.get(id) {
                Some(item) => item.status != ItemStatus::Processing || percent <= item.progress,
                None => true,
            }
        };
        if stale {
            return;
        }
        Self::update_item(shared, id, |item| {
            if item.status == ItemStatus::Processing && percent > item.progress {
                item.progress = percent.min(100);
            }
        });
    }

    /// Drives one item to a terminal state, retrying up to the budget.
    ///
    /// The item's visible status re-enters `Processing` on every attempt; an
    /// intermediate `Error` is never exposed until retries are exhausted.
    async fn process_item(
        shared: &Arc<Self>,
        id: &str,
        target: MediaFormat,
        options: EncodeOptions,
    ) {
        let max_retries = shared.config.max_retries;
        let mut attempt: u32 = 0;

        loop {
            let started = Utc::now();
            Self::update_item(shared, id, |item| {
                item.status = ItemStatus::Processing;
                item.progress = 0;
                item.error = None;
                item.started_at = Some(started);
                item.finished_at = None;
                item.duration_ms = None;
            });

            match Self::run_attempt(shared, id, target, options.clone()).await {
                Ok(result) => {
                    let finished = Utc::now();
                    let duration_ms = (finished - started).num_milliseconds().max(0) as u64;
                    debug!("Item {} complete in {}ms", id, duration_ms);
                    metrics::ITEMS_TOTAL.with_label_values(&["complete"]).inc();
                    Self::update_item(shared, id, |item| {
                        item.status = ItemStatus::Complete;
                        item.progress = 100;
                        item.result = Some(result);
                        item.finished_at = Some(finished);
                        item.duration_ms = Some(duration_ms);
                    });
                    return;
                }
                Err(AttemptError::Missing) => {
                    debug!("Item {} vanished mid-flight, dropping attempt", id);
                    return;
                }
                Err(e) => {
                    if e.is_retryable() && attempt < max_retries {
                        attempt += 1;
                        metrics::RETRY_ATTEMPTS.inc();
                        warn!(
                            "Item {} attempt {}/{} failed, retrying: {}",
                            id,
                            attempt,
                            max_retries + 1,
                            e
                        );
                        continue;
                    }

                    let finished = Utc::now();
                    let duration_ms = (finished - started).num_milliseconds().max(0) as u64;
                    warn!("Item {} failed: {}", id, e);
                    metrics::ITEMS_TOTAL.with_label_values(&["error"]).inc();
                    Self::update_item(shared, id, |item| {
                        item.status = ItemStatus::Error;
                        item.error = Some(e.to_string());
                        item.progress = 0;
                        item.finished_at = Some(finished);
                        item.duration_ms = Some(duration_ms);
                    });
                    return;
                }
            }
        }
    }

    /// One processing attempt: optional resize transform, then conversion.
    async fn run_attempt(
        shared: &Arc<Self>,
        id: &str,
        target: MediaFormat,
        options: EncodeOptions,
    ) -> Result<ConversionResult, AttemptError> {
        let (mut source, resize, original_dimensions) = {
            let items = shared.items_read();
            let item = items.get(id).ok_or(AttemptError::Missing)?;
            (item.source.clone(), item.resize.clone(), item.original_dimensions)
        };

        if let (Some(config), Some(dims)) = (resize, original_dimensions) {
            if needs_resize(&config, dims) {
                Self::set_progress(shared, id, RESIZE_START_PROGRESS);

                let format = MediaFormat::detect(&source.data).ok_or_else(|| {
                    AttemptError::Convert(ConvertError::FormatDetection {
                        filename: source.name.clone(),
                    })
                })?;

                let data = Arc::clone(&source.data);
                let resized = tokio::task::spawn_blocking(move || {
                    resize_image(&data, format, &config)
                })
                .await
                .map_err(|e| {
                    AttemptError::Transform(TransformError::Codec(
                        crate::codec::CodecError::encode_failed(format!(
                            "resize task panicked: {e}"
                        )),
                    ))
                })?
                .map_err(AttemptError::Transform)?;

                Self::set_progress(shared, id, RESIZE_DONE_PROGRESS);
                source = SourceFile::new(source.name.clone(), resized);
            }
        }

        // Forward codec progress ticks into the item while the conversion
        // runs. The monotonic guard in set_progress keeps the synthetic
        // resize milestones and codec percentages from ever regressing.
        let (progress_tx, mut progress_rx) = mpsc::channel::<TaskProgress>(32);
        let forward_shared = Arc::clone(shared);
        let forward_id = id.to_string();
        let forwarder = tokio::spawn(async move {
            while let Some(tick) = progress_rx.recv().await {
                BatchShared::set_progress(&forward_shared, &forward_id, tick.percent);
            }
        });

        let outcome = shared
            .service
            .convert(&source, target, options, Some(progress_tx))
            .await;
        let _ = forwarder.await;

        outcome.map_err(AttemptError::Convert)
    }
}
