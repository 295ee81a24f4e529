//! Publish/subscribe layer for batch state changes.
//!
//! Deliberately minimal: every mutation in the manager produces one fresh
//! [`BatchState`] snapshot, delivered synchronously to every subscriber in
//! registration order. There is no coalescing, batching or backpressure.
//! The contract is "at least once per state change, no upper bound
//! guarantee", and active batches notify on every progress tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

use super::types::BatchState;

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&BatchState) + Send + Sync>;

/// Registry of state-change subscribers.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    subscribers: RwLock<Vec<(u64, Callback)>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    /// Registers a callback. Callbacks run synchronously on the mutating
    /// task; keep them fast.
    pub fn subscribe(&self, callback: impl Fn(&BatchState) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        SubscriptionId(id)
    }

    /// Removes a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id.0);
        subscribers.len() != before
    }

    /// Invokes every subscriber with the snapshot, in registration order.
    ///
    /// Callbacks are cloned out of the lock first, so a callback may
    /// re-enter the registry (subscribe/unsubscribe) without deadlocking.
    pub fn notify(&self, state: &BatchState) {
        let callbacks: Vec<Callback> = {
            let subscribers = self
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        trace!(
            "Notifying {} subscribers ({} items)",
            callbacks.len(),
            state.total_items
        );
        for callback in callbacks {
            callback(state);
        }
    }

    /// Number of active subscriptions.
    pub fn count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn empty_state() -> BatchState {
        BatchState::derive(&HashMap::new(), false)
    }

    #[test]
    fn test_subscribe_and_notify() {
        let registry = ObserverRegistry::default();
        let seen = Arc::new(Mutex::new(0));

        let seen_clone = Arc::clone(&seen);
        registry.subscribe(move |_| {
            *seen_clone.lock().unwrap() += 1;
        });

        registry.notify(&empty_state());
        registry.notify(&empty_state());
        assert_eq!(*seen.lock().unwrap(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let registry = ObserverRegistry::default();
        let seen = Arc::new(Mutex::new(0));

        let seen_clone = Arc::clone(&seen);
        let id = registry.subscribe(move |_| {
            *seen_clone.lock().unwrap() += 1;
        });

        registry.notify(&empty_state());
        assert!(registry.unsubscribe(id));
        registry.notify(&empty_state());

        assert_eq!(*seen.lock().unwrap(), 1);
        assert!(!registry.unsubscribe(id));
    }

    #[test]
    fn test_notify_in_registration_order() {
        let registry = ObserverRegistry::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order_clone = Arc::clone(&order);
            registry.subscribe(move |_| {
                order_clone.lock().unwrap().push(label);
            });
        }

        registry.notify(&empty_state());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_reentrant_subscribe_does_not_deadlock() {
        let registry = Arc::new(ObserverRegistry::default());

        let registry_clone = Arc::clone(&registry);
        registry.subscribe(move |_| {
            registry_clone.subscribe(|_| {});
        });

        registry.notify(&empty_state());
        assert_eq!(registry.count(), 2);
    }
}
