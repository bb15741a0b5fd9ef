// src/notify/data_ready.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use log::trace;

use super::{lock, Notification, NotificationSink, ObserverId, ObserverRegistry, RainObserver};

/// Synchronous notification sink.
///
/// Observers run inline on the ingestion thread. After they return the
/// "data ready" flag is raised so one caller blocked in
/// [`DataReadySignal::wait_for_data`] wakes up. The flag is a single bit:
/// several lines arriving between two waits collapse into one wake-up.
#[derive(Default)]
pub struct DataReadySignal {
    ready: Mutex<bool>,
    cond: Condvar,
    registry: ObserverRegistry,
    stopped: AtomicBool,
}

impl DataReadySignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag and wakes waiters.
    pub fn set(&self) {
        *lock(&self.ready) = true;
        self.cond.notify_all();
    }

    pub fn clear(&self) {
        *lock(&self.ready) = false;
    }

    pub fn is_set(&self) -> bool {
        *lock(&self.ready)
    }

    /// Blocks until the flag is raised or `timeout` elapses.
    ///
    /// Returns `true` if the flag was raised; it is cleared on return so the
    /// next call waits for a new line. Returns `false` at once after
    /// [`NotificationSink::shutdown`].
    pub fn wait_for_data(&self, timeout: Duration) -> bool {
        let guard = lock(&self.ready);
        let (mut ready, _) = self
            .cond
            .wait_timeout_while(guard, timeout, |ready| !*ready && !self.is_stopped())
            .unwrap_or_else(PoisonError::into_inner);
        if !*ready {
            trace!("No data within {:?}", timeout);
            return false;
        }
        *ready = false;
        true
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

impl NotificationSink for DataReadySignal {
    fn deliver(&self, notification: Notification) {
        if self.is_stopped() {
            return;
        }
        self.registry.dispatch(&notification);
        self.set();
    }

    fn add_observer(&self, observer: Arc<dyn RainObserver>) -> ObserverId {
        self.registry.add(observer)
    }

    fn remove_observer(&self, id: ObserverId) -> bool {
        self.registry.remove(id)
    }

    fn shutdown(&self) {
        {
            // Under the lock so a waiter cannot miss the wake-up
            let _ready = lock(&self.ready);
            self.stopped.store(true, Ordering::Release);
        }
        // Release anyone still waiting; they see no data
        self.cond.notify_all();
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_wait_times_out_without_data() {
        let signal = DataReadySignal::new();
        let started = Instant::now();
        assert!(!signal.wait_for_data(Duration::from_millis(100)));
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(90), "returned after {:?}", waited);
        assert!(waited < Duration::from_secs(1), "returned after {:?}", waited);
    }

    #[test]
    fn test_flag_set_before_wait_is_consumed_once() {
        let signal = DataReadySignal::new();
        signal.set();
        assert!(signal.is_set());
        assert!(signal.wait_for_data(Duration::from_millis(10)));
        assert!(!signal.is_set());
        assert!(!signal.wait_for_data(Duration::from_millis(10)));
    }

    #[test]
    fn test_multiple_lines_collapse_into_one_wakeup() {
        let signal = DataReadySignal::new();
        signal.deliver(Notification::RainEvent);
        signal.deliver(Notification::ResetComplete);
        assert!(signal.wait_for_data(Duration::from_millis(10)));
        assert!(!signal.wait_for_data(Duration::from_millis(10)));
    }

    #[test]
    fn test_waiter_woken_from_other_thread() {
        let signal = Arc::new(DataReadySignal::new());
        let producer = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.deliver(Notification::RainEvent);
        });

        assert!(signal.wait_for_data(Duration::from_secs(5)));
        handle.join().unwrap();
    }

    #[test]
    fn test_observers_run_before_flag() {
        let signal = Arc::new(DataReadySignal::new());
        let seen_flag = Arc::new(AtomicUsize::new(0));

        let (watched, seen) = (Arc::clone(&signal), Arc::clone(&seen_flag));
        signal.add_observer(Arc::new(move |_: &Notification| {
            seen.store(if watched.is_set() { 2 } else { 1 }, Ordering::SeqCst);
        }));

        signal.deliver(Notification::RainEvent);
        assert_eq!(seen_flag.load(Ordering::SeqCst), 1);
        assert!(signal.is_set());
    }

    #[test]
    fn test_shutdown_releases_waiter() {
        let signal = Arc::new(DataReadySignal::new());
        let stopper = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            stopper.shutdown();
        });

        let started = Instant::now();
        assert!(!signal.wait_for_data(Duration::from_millis(1500)));
        let waited = started.elapsed();
        assert!(waited < Duration::from_millis(1000), "returned after {:?}", waited);
        handle.join().unwrap();

        // Later waits return at once
        let started = Instant::now();
        assert!(!signal.wait_for_data(Duration::from_millis(1500)));
        assert!(started.elapsed() < Duration::from_millis(1000));
    }

    #[test]
    fn test_deliver_after_shutdown_is_ignored() {
        let signal = DataReadySignal::new();
        signal.shutdown();
        signal.deliver(Notification::RainEvent);
        assert!(!signal.is_set());
    }
}
