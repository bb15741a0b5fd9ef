//! Delivery of classified lines to registered observers.
//!
//! Two strategies sit behind [`NotificationSink`]:
//!
//! - [`EventBus`]: bounded queue drained by a dedicated delivery thread.
//!   Posting never blocks the ingestion path longer than the post timeout;
//!   notifications that do not fit are dropped.
//! - [`DataReadySignal`]: single-bit "data ready" flag for callers that poll
//!   with [`DataReadySignal::wait_for_data`]. Observers are called inline.
//!
//! A session uses exactly one of them, picked with [`DeliveryMode`].

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use arrayvec::ArrayString;

use crate::common::{RainReading, StatementKind};

mod data_ready;
mod event_bus;
mod registry;

pub use data_ready::DataReadySignal;
pub use event_bus::{EventBus, DELIVERY_TASK_NAME};
pub use registry::ObserverRegistry;

/// Longest unknown-statement text kept for diagnostics.
pub const UNKNOWN_TEXT_CAPACITY: usize = 128;

pub type UnknownText = ArrayString<UNKNOWN_TEXT_CAPACITY>;

/// What observers receive for each classified line.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A data report was parsed; carries the published snapshot.
    Update(RainReading),
    /// The sensor finished a reboot/reset.
    ResetComplete,
    /// The sensor signalled the start of a rain event.
    RainEvent,
    /// Unrecognised statement, with its (possibly truncated) text.
    Unknown(UnknownText),
}

impl Notification {
    /// Builds an [`Notification::Unknown`] from raw line bytes.
    ///
    /// Control and non-ASCII bytes are replaced with `?`; text beyond
    /// [`UNKNOWN_TEXT_CAPACITY`] is dropped.
    pub fn unknown(line: &[u8]) -> Self {
        let mut text = UnknownText::new();
        for &b in line {
            let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' };
            if text.try_push(c).is_err() {
                break;
            }
        }
        Notification::Unknown(text)
    }

    pub fn kind(&self) -> StatementKind {
        match self {
            Notification::Update(_) => StatementKind::DataReport,
            Notification::ResetComplete => StatementKind::RebootComplete,
            Notification::RainEvent => StatementKind::RainEvent,
            Notification::Unknown(_) => StatementKind::Unknown,
        }
    }

    pub fn reading(&self) -> Option<&RainReading> {
        match self {
            Notification::Update(reading) => Some(reading),
            _ => None,
        }
    }
}

/// Receives notifications from a sink.
///
/// Implemented for any `Fn(&Notification)` closure; use [`ContextObserver`]
/// to pass an explicit context value instead of capturing it.
pub trait RainObserver: Send + Sync {
    fn notify(&self, notification: &Notification);
}

impl<F> RainObserver for F
where
    F: Fn(&Notification) + Send + Sync,
{
    fn notify(&self, notification: &Notification) {
        self(notification)
    }
}

/// Observer made of a context value and a handler receiving it.
pub struct ContextObserver<C, F> {
    context: C,
    handler: F,
}

impl<C, F> ContextObserver<C, F>
where
    C: Send + Sync,
    F: Fn(&C, &Notification) + Send + Sync,
{
    pub fn new(context: C, handler: F) -> Self {
        ContextObserver { context, handler }
    }

    pub fn context(&self) -> &C {
        &self.context
    }
}

impl<C, F> RainObserver for ContextObserver<C, F>
where
    C: Send + Sync,
    F: Fn(&C, &Notification) + Send + Sync,
{
    fn notify(&self, notification: &Notification) {
        (self.handler)(&self.context, notification)
    }
}

/// Handle for removing a registered observer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Delivers classified lines to observers.
pub trait NotificationSink: Send + Sync {
    /// Hands one notification to the observers. Called from the ingestion task.
    fn deliver(&self, notification: Notification);

    fn add_observer(&self, observer: Arc<dyn RainObserver>) -> ObserverId;

    /// Removes an observer. Returns `false` if `id` was not registered.
    fn remove_observer(&self, id: ObserverId) -> bool;

    /// Stops delivery. Further notifications are discarded.
    fn shutdown(&self);
}

/// Which notification strategy a session uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Asynchronous event bus with its own delivery thread.
    #[default]
    EventBus,
    /// Synchronous data-ready signal with bounded waits.
    DataReady,
}

/// The sink a session was started with.
pub enum Sink {
    Bus(EventBus),
    Signal(DataReadySignal),
}

impl Sink {
    /// Creates the sink for `mode`, spawning the delivery thread if needed.
    pub fn start(mode: DeliveryMode, queue_len: usize, post_timeout: Duration) -> io::Result<Self> {
        match mode {
            DeliveryMode::EventBus => Ok(Sink::Bus(EventBus::start(queue_len, post_timeout)?)),
            DeliveryMode::DataReady => Ok(Sink::Signal(DataReadySignal::new())),
        }
    }

    pub fn mode(&self) -> DeliveryMode {
        match self {
            Sink::Bus(_) => DeliveryMode::EventBus,
            Sink::Signal(_) => DeliveryMode::DataReady,
        }
    }

    pub fn data_ready(&self) -> Option<&DataReadySignal> {
        match self {
            Sink::Signal(signal) => Some(signal),
            Sink::Bus(_) => None,
        }
    }

    fn inner(&self) -> &dyn NotificationSink {
        match self {
            Sink::Bus(bus) => bus,
            Sink::Signal(signal) => signal,
        }
    }
}

impl NotificationSink for Sink {
    fn deliver(&self, notification: Notification) {
        self.inner().deliver(notification)
    }

    fn add_observer(&self, observer: Arc<dyn RainObserver>) -> ObserverId {
        self.inner().add_observer(observer)
    }

    fn remove_observer(&self, id: ObserverId) -> bool {
        self.inner().remove_observer(id)
    }

    fn shutdown(&self) {
        self.inner().shutdown()
    }
}

/// Locks a mutex, recovering the data if a panicking thread poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
