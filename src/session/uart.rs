// src/session/uart.rs

use core::fmt::Debug;

use crate::common::{LineSource, LinkConfig};

/// Notification raised by the UART driver for the ingestion task.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UartEvent {
    /// Bytes arrived. Lines are only handled on [`UartEvent::PatternDetected`].
    Data,
    /// Hardware FIFO overflowed.
    FifoOverflow,
    /// Driver ring buffer is full.
    BufferFull,
    /// Line break detected on RX.
    Break,
    ParityError,
    FrameError,
    /// A line terminator was seen and its position queued.
    PatternDetected,
    /// Driver-specific event code the session does not handle.
    Other(u32),
}

/// Handle the driver uses to post [`UartEvent`]s to the ingestion task.
///
/// Posting never blocks; an event that does not fit in the queue is dropped
/// and `post` returns `false`.
#[derive(Debug, Clone)]
pub struct UartEventSender(flume::Sender<UartEvent>);

impl UartEventSender {
    pub(crate) fn new(tx: flume::Sender<UartEvent>) -> Self {
        UartEventSender(tx)
    }

    pub fn post(&self, event: UartEvent) -> bool {
        self.0.try_send(event).is_ok()
    }
}

/// Receive side of the sensor UART, owned by the ingestion task.
pub trait UartDriver: LineSource {
    /// Applies `config`, enables terminator detection and starts posting
    /// events through `events`.
    fn install(&mut self, config: &LinkConfig, events: UartEventSender) -> Result<(), <Self as LineSource>::Error>;

    /// Stops the driver and frees its buffers.
    fn release(&mut self) -> Result<(), <Self as LineSource>::Error>;
}

/// Formats a driver error for [`SessionError`](super::SessionError).
pub(super) fn describe<E: Debug>(e: E) -> String {
    format!("{:?}", e)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_never_blocks_on_full_queue() {
        let (tx, rx) = flume::bounded(1);
        let sender = UartEventSender::new(tx);
        assert!(sender.post(UartEvent::PatternDetected));
        assert!(!sender.post(UartEvent::Data));
        assert_eq!(rx.try_recv(), Ok(UartEvent::PatternDetected));
    }

    #[test]
    fn test_post_after_receiver_dropped() {
        let (tx, rx) = flume::bounded(4);
        let sender = UartEventSender::new(tx);
        drop(rx);
        assert!(!sender.post(UartEvent::Break));
    }
}
