// src/session/ingest.rs

use std::sync::{Arc, Mutex};

use flume::{Receiver, RecvError, Selector};
use log::{debug, error, info, warn};

use super::uart::{UartDriver, UartEvent};
use crate::common::{RainReading, StatementKind};
use crate::notify::{lock, Notification, NotificationSink, Sink};
use crate::protocol::{classify, extract_fields, FrameOutcome, LineFramer};

/// State shared between the session handle and the ingestion task.
pub(super) struct Shared {
    pub(super) latest: Mutex<RainReading>,
    pub(super) sink: Sink,
}

impl Shared {
    pub(super) fn new(sink: Sink) -> Self {
        Shared {
            latest: Mutex::new(RainReading::default()),
            sink,
        }
    }

    pub(super) fn latest(&self) -> RainReading {
        *lock(&self.latest)
    }

    /// Classifies one framed line, publishes any new reading and notifies.
    pub(super) fn handle_line(&self, line: &[u8]) {
        let notification = match classify(line) {
            StatementKind::RebootComplete => {
                info!("Sensor reboot complete");
                Notification::ResetComplete
            }
            StatementKind::RainEvent => {
                info!("Rain event started");
                Notification::RainEvent
            }
            StatementKind::DataReport => {
                let report = extract_fields(line, self.latest());
                // Publish the whole snapshot at once
                *lock(&self.latest) = report.reading;
                Notification::Update(report.reading)
            }
            StatementKind::Unknown => {
                let text = trim_line(line);
                warn!("Unknown statement: {}", String::from_utf8_lossy(text));
                Notification::unknown(text)
            }
        };
        self.sink.deliver(notification);
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !matches!(b, b'\r' | b'\n' | 0))
        .map_or(0, |i| i + 1);
    &line[..end]
}

enum Wake {
    Event(Result<UartEvent, RecvError>),
    Shutdown,
}

/// The ingestion task: waits on driver events and services them in order.
pub(super) struct Ingestion<U> {
    uart: U,
    framer: LineFramer,
    events: Receiver<UartEvent>,
    shutdown: Receiver<()>,
    shared: Arc<Shared>,
}

impl<U: UartDriver> Ingestion<U> {
    pub(super) fn new(uart: U, events: Receiver<UartEvent>, shutdown: Receiver<()>, shared: Arc<Shared>) -> Self {
        Ingestion {
            uart,
            framer: LineFramer::new(),
            events,
            shutdown,
            shared,
        }
    }

    /// Runs until shutdown is requested, then hands the driver back.
    pub(super) fn run(mut self) -> U {
        debug!("Ingestion task started");
        loop {
            let wake = Selector::new()
                .recv(&self.shutdown, |_| Wake::Shutdown)
                .recv(&self.events, Wake::Event)
                .wait();

            match wake {
                Wake::Event(Ok(event)) => self.handle_event(event),
                Wake::Event(Err(RecvError::Disconnected)) => {
                    warn!("UART driver dropped its event queue, stopping");
                    break;
                }
                Wake::Shutdown => break,
            }
        }
        debug!(
            "Ingestion task stopped after {} lines ({} lost)",
            self.framer.lines(),
            self.framer.lost()
        );
        self.uart
    }

    fn handle_event(&mut self, event: UartEvent) {
        match event {
            UartEvent::PatternDetected => {
                if let FrameOutcome::Line(line) = self.framer.on_pattern_detected(&mut self.uart) {
                    self.shared.handle_line(line.as_bytes());
                }
            }
            UartEvent::FifoOverflow | UartEvent::BufferFull => {
                warn!("UART {:?}, flushing input", event);
                if let Err(e) = self.uart.flush_input() {
                    error!("Flushing UART input failed: {:?}", e);
                }
                let discarded = self.events.drain().count();
                if discarded > 0 {
                    debug!("Discarded {} queued UART events", discarded);
                }
            }
            UartEvent::Break => info!("UART RX break detected"),
            UartEvent::ParityError => error!("UART parity error"),
            UartEvent::FrameError => error!("UART frame error"),
            UartEvent::Data => {}
            UartEvent::Other(code) => warn!("Unhandled UART event type: {}", code),
        }
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    use crate::notify::DeliveryMode;

    fn shared_with_signal() -> Shared {
        Shared::new(Sink::start(DeliveryMode::DataReady, 4, Duration::from_millis(10)).unwrap())
    }

    fn collect(shared: &Shared) -> mpsc::Receiver<Notification> {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        shared.sink.add_observer(Arc::new(move |n: &Notification| {
            let _ = lock(&tx).send(n.clone());
        }));
        rx
    }

    #[test]
    fn test_data_report_published_and_notified() {
        let shared = shared_with_signal();
        let seen = collect(&shared);

        shared.handle_line(b"Acc 12.5 0.3 450.75 2.10 \n");

        let expected = RainReading {
            current_accumulated_mm: 12.5,
            event_accumulated_mm: 0.3,
            total_mm: 450.75,
            rate_mm_per_hour: 2.10,
        };
        assert_eq!(shared.latest(), expected);
        assert_eq!(seen.try_recv().unwrap(), Notification::Update(expected));
        assert!(shared.sink.data_ready().unwrap().is_set());
    }

    #[test]
    fn test_partial_report_keeps_missing_fields() {
        let shared = shared_with_signal();
        shared.handle_line(b"Acc 1 2 3 4 \n");
        shared.handle_line(b"Acc 5.0 1.0 \n");

        let latest = shared.latest();
        assert_eq!(latest.current_accumulated_mm, 5.0);
        assert_eq!(latest.event_accumulated_mm, 1.0);
        assert_eq!(latest.total_mm, 3.0);
        assert_eq!(latest.rate_mm_per_hour, 4.0);
    }

    #[test]
    fn test_non_data_lines_leave_reading_alone() {
        let shared = shared_with_signal();
        let seen = collect(&shared);
        shared.handle_line(b"Acc 1 2 3 4 \n");
        let before = shared.latest();

        shared.handle_line(b"PwrDays 0\n");
        shared.handle_line(b"Event\n");
        shared.handle_line(b"Hello sensor\r\n");

        assert_eq!(shared.latest(), before);
        let kinds: Vec<_> = seen.try_iter().map(|n| n.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                StatementKind::DataReport,
                StatementKind::RebootComplete,
                StatementKind::RainEvent,
                StatementKind::Unknown,
            ]
        );
    }

    #[test]
    fn test_unknown_text_is_trimmed() {
        let shared = shared_with_signal();
        let seen = collect(&shared);
        shared.handle_line(b"Firmware 3.1\r\n");
        match seen.try_recv().unwrap() {
            Notification::Unknown(text) => assert_eq!(text.as_str(), "Firmware 3.1"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_trim_line() {
        assert_eq!(trim_line(b"abc\r\n"), b"abc");
        assert_eq!(trim_line(b"\n"), b"");
        assert_eq!(trim_line(b""), b"");
        assert_eq!(trim_line(b"a b\0"), b"a b");
    }
}
