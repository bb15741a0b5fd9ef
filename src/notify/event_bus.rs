// src/notify/event_bus.rs

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::SendTimeoutError;
use log::{debug, error, warn};

use super::{lock, Notification, NotificationSink, ObserverId, ObserverRegistry, RainObserver};

/// Name of the event delivery thread.
pub const DELIVERY_TASK_NAME: &str = "rainsensor_events";

/// Asynchronous notification sink.
///
/// `deliver` enqueues into a bounded queue, waiting at most the post timeout
/// for space. A dedicated thread drains the queue and calls every observer in
/// registration order. When the queue stays full the notification is dropped:
/// the ingestion path favours fresh data over completeness.
pub struct EventBus {
    registry: Arc<ObserverRegistry>,
    tx: Mutex<Option<flume::Sender<Notification>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    post_timeout: Duration,
    dropped: AtomicU64,
}

impl EventBus {
    /// Creates the queue and spawns the delivery thread.
    pub fn start(queue_len: usize, post_timeout: Duration) -> io::Result<Self> {
        let (tx, rx) = flume::bounded::<Notification>(queue_len);
        let registry = Arc::new(ObserverRegistry::new());

        let worker_registry = Arc::clone(&registry);
        let worker = thread::Builder::new()
            .name(DELIVERY_TASK_NAME.into())
            .spawn(move || {
                debug!("Event delivery task started");
                for notification in rx.iter() {
                    worker_registry.dispatch(&notification);
                }
                debug!("Event delivery task stopped");
            })?;

        Ok(EventBus {
            registry,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            post_timeout,
            dropped: AtomicU64::new(0),
        })
    }

    /// Enqueues a notification, waiting at most `timeout` for queue space.
    ///
    /// Returns `false` if the notification was dropped.
    pub fn post(&self, notification: Notification, timeout: Duration) -> bool {
        let Some(tx) = lock(&self.tx).clone() else {
            debug!("Event bus stopped, discarding {:?}", notification.kind());
            return false;
        };

        match tx.send_timeout(notification, timeout) {
            Ok(()) => true,
            Err(SendTimeoutError::Timeout(notification)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Event queue full, dropping {:?}", notification.kind());
                false
            }
            Err(SendTimeoutError::Disconnected(notification)) => {
                warn!("Event delivery task gone, dropping {:?}", notification.kind());
                false
            }
        }
    }

    /// Notifications dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn observer_count(&self) -> usize {
        self.registry.len()
    }
}

impl NotificationSink for EventBus {
    fn deliver(&self, notification: Notification) {
        self.post(notification, self.post_timeout);
    }

    fn add_observer(&self, observer: Arc<dyn RainObserver>) -> ObserverId {
        self.registry.add(observer)
    }

    fn remove_observer(&self, id: ObserverId) -> bool {
        self.registry.remove(id)
    }

    /// Closes the queue, lets the delivery thread drain it, then joins it.
    fn shutdown(&self) {
        drop(lock(&self.tx).take());

        let Some(worker) = lock(&self.worker).take() else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            // Called from an observer; the thread exits once the queue drains
            return;
        }
        if worker.join().is_err() {
            error!("Event delivery task panicked");
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.shutdown();
    }
}
