// src/notify/registry.rs

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error};

use super::{lock, Notification, ObserverId, RainObserver};

type Entries = Arc<Vec<(ObserverId, Arc<dyn RainObserver>)>>;

/// Observer list shared between registration calls and the delivering thread.
///
/// The list is copy-on-write: dispatch takes a snapshot without allocating,
/// so observers may register or remove observers from inside a callback.
#[derive(Default)]
pub struct ObserverRegistry {
    entries: Mutex<Entries>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Arc<dyn RainObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut entries = lock(&self.entries);
        let mut updated = Vec::with_capacity(entries.len() + 1);
        updated.extend(entries.iter().cloned());
        updated.push((id, observer));
        *entries = Arc::new(updated);
        debug!("Observer {:?} registered", id);
        id
    }

    pub fn remove(&self, id: ObserverId) -> bool {
        let mut entries = lock(&self.entries);
        if !entries.iter().any(|(entry_id, _)| *entry_id == id) {
            return false;
        }
        let updated: Vec<_> = entries
            .iter()
            .filter(|(entry_id, _)| *entry_id != id)
            .cloned()
            .collect();
        *entries = Arc::new(updated);
        debug!("Observer {:?} removed", id);
        true
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls every observer in registration order.
    ///
    /// A panicking observer is logged and skipped; the remaining observers
    /// still run.
    pub fn dispatch(&self, notification: &Notification) {
        let snapshot = Arc::clone(&lock(&self.entries));
        for (id, observer) in snapshot.iter() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| observer.notify(notification)));
            if result.is_err() {
                error!("Observer {:?} panicked handling {:?}", id, notification.kind());
            }
        }
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_observer(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Arc<dyn RainObserver> {
        let log = Arc::clone(log);
        Arc::new(move |_: &Notification| log.lock().unwrap().push(name))
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let registry = ObserverRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.add(recording_observer(&log, "a"));
        registry.add(recording_observer(&log, "b"));
        registry.add(recording_observer(&log, "c"));

        registry.dispatch(&Notification::RainEvent);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = ObserverRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = registry.add(recording_observer(&log, "a"));
        registry.add(recording_observer(&log, "b"));

        assert!(registry.remove(a));
        assert!(!registry.remove(a));
        assert_eq!(registry.len(), 1);

        registry.dispatch(&Notification::ResetComplete);
        assert_eq!(*log.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn test_empty_registry() {
        let registry = ObserverRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.remove(ObserverId(42)));
        registry.dispatch(&Notification::RainEvent);
    }

    #[test]
    fn test_panicking_observer_does_not_stop_dispatch() {
        let registry = ObserverRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.add(Arc::new(|_: &Notification| panic!("observer failure")));
        registry.add(recording_observer(&log, "after"));

        registry.dispatch(&Notification::RainEvent);
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn test_observer_can_unregister_itself() {
        let registry = Arc::new(ObserverRegistry::new());
        let own_id = Arc::new(Mutex::new(None::<ObserverId>));
        let hits = Arc::new(AtomicU64::new(0));

        let (reg, id_slot, counter) = (Arc::clone(&registry), Arc::clone(&own_id), Arc::clone(&hits));
        let id = registry.add(Arc::new(move |_: &Notification| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *id_slot.lock().unwrap() {
                reg.remove(id);
            }
        }));
        *own_id.lock().unwrap() = Some(id);

        registry.dispatch(&Notification::RainEvent);
        registry.dispatch(&Notification::RainEvent);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }
}
