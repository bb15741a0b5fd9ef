// src/session/mod.rs

//! A running rain sensor parser.
//!
//! [`RainSensorParser::init`] configures the reset line, installs the UART
//! driver and starts the ingestion task. From then on every line the sensor
//! prints is framed, classified and handed to the registered observers, while
//! the handle itself is used to send commands, pulse the reset line and read
//! the latest published [`RainReading`].

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info};

use crate::common::{timing, Command, LinkConfig, RainError, RainReading, RainSerialTx, RainTimer, ResetLine};
use crate::notify::{DeliveryMode, NotificationSink, ObserverId, RainObserver, Sink, DELIVERY_TASK_NAME};

mod ingest;
mod io_helpers;
mod uart;

pub use uart::{UartDriver, UartEvent, UartEventSender};

use ingest::{Ingestion, Shared};
use uart::describe;

/// Name of the ingestion thread.
pub const PARSER_TASK_NAME: &str = "rainsensor_parser";

/// Parameters for one parser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// UART settings passed to the driver.
    pub link: LinkConfig,
    pub delivery: DeliveryMode,
    /// Depth of the event bus queue.
    pub notify_queue_len: usize,
    /// Longest time the ingestion task waits to post to a full event bus.
    pub post_timeout: Duration,
    /// Bound of each data-ready wait while a reset runs.
    pub wait_timeout: Duration,
    /// Lines the sensor prints while booting.
    pub banner_lines: usize,
    pub task_name: &'static str,
    pub task_stack_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            link: LinkConfig::default(),
            delivery: DeliveryMode::default(),
            notify_queue_len: 16,
            post_timeout: timing::POST_TIMEOUT,
            wait_timeout: timing::DATA_WAIT_TIMEOUT,
            banner_lines: timing::BOOT_BANNER_LINES,
            task_name: PARSER_TASK_NAME,
            task_stack_size: 64 * 1024,
        }
    }
}

/// Errors starting or stopping a session.
///
/// Hardware error values are kept as their `Debug` text since the driver and
/// pin error types differ.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Reset line configuration failed: {0}")]
    ResetLineConfig(String),

    #[error("UART driver install failed: {0}")]
    DriverInstall(String),

    #[error("Failed to spawn task '{task}'")]
    Spawn {
        task: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Task '{0}' panicked")]
    TaskPanicked(&'static str),

    #[error("UART driver release failed: {0}")]
    DriverRelease(String),
}

/// Handle to a running parser session.
///
/// Owns the outbound link, the reset line and the timer. The UART driver is
/// owned by the ingestion task until [`RainSensorParser::deinit`] hands it
/// back for release. Dropping the handle without `deinit` stops the task but
/// leaves the driver installed.
pub struct RainSensorParser<U, TX, RST, T> {
    tx: TX,
    reset_line: RST,
    timer: T,
    config: SessionConfig,
    shared: Arc<Shared>,
    shutdown: flume::Sender<()>,
    task: JoinHandle<Option<U>>,
}

impl<U, TX, RST, T> RainSensorParser<U, TX, RST, T>
where
    U: UartDriver + Send + 'static,
    RST: ResetLine,
{
    /// Starts a session.
    ///
    /// On failure everything acquired so far is released again before the
    /// error is returned.
    pub fn init(config: SessionConfig, mut uart: U, tx: TX, mut reset_line: RST, timer: T) -> Result<Self, SessionError> {
        reset_line
            .configure()
            .map_err(|e| SessionError::ResetLineConfig(describe(e)))?;

        let sink = Sink::start(config.delivery, config.notify_queue_len, config.post_timeout).map_err(|source| {
            SessionError::Spawn {
                task: DELIVERY_TASK_NAME,
                source,
            }
        })?;
        let shared = Arc::new(Shared::new(sink));

        let (event_tx, event_rx) = flume::bounded(config.link.event_queue_len);
        let (shutdown_tx, shutdown_rx) = flume::bounded(1);
        // The driver is handed over only once it is installed
        let (handoff_tx, handoff_rx) = flume::bounded::<U>(1);

        let task_shared = Arc::clone(&shared);
        let spawned = thread::Builder::new()
            .name(config.task_name.into())
            .stack_size(config.task_stack_size)
            .spawn(move || {
                let uart = handoff_rx.recv().ok()?;
                Some(Ingestion::new(uart, event_rx, shutdown_rx, task_shared).run())
            });
        let task = match spawned {
            Ok(task) => task,
            Err(source) => {
                shared.sink.shutdown();
                return Err(SessionError::Spawn {
                    task: config.task_name,
                    source,
                });
            }
        };

        if let Err(e) = uart.install(&config.link, UartEventSender::new(event_tx)) {
            drop(handoff_tx);
            let _ = task.join();
            shared.sink.shutdown();
            return Err(SessionError::DriverInstall(describe(e)));
        }

        if let Err(flume::SendError(mut uart)) = handoff_tx.send(uart) {
            if let Err(e) = uart.release() {
                error!("Releasing UART driver failed: {:?}", e);
            }
            let _ = task.join();
            shared.sink.shutdown();
            return Err(SessionError::TaskPanicked(config.task_name));
        }

        info!(
            "Rain sensor parser started ({} baud, {:?} delivery)",
            config.link.baud_rate, config.delivery
        );

        Ok(RainSensorParser {
            tx,
            reset_line,
            timer,
            config,
            shared,
            shutdown: shutdown_tx,
            task,
        })
    }

    /// Stops the ingestion task, releases the UART driver and stops delivery.
    ///
    /// The sink is stopped even if releasing the driver fails.
    pub fn deinit(self) -> Result<(), SessionError> {
        let task_name = self.config.task_name;
        let _ = self.shutdown.try_send(());

        let result = match self.task.join() {
            Ok(Some(mut uart)) => uart
                .release()
                .map_err(|e| SessionError::DriverRelease(describe(e))),
            Ok(None) => Ok(()),
            Err(_) => Err(SessionError::TaskPanicked(task_name)),
        };

        self.shared.sink.shutdown();
        info!("Rain sensor parser stopped");
        result
    }
}

impl<U, TX, RST, T> RainSensorParser<U, TX, RST, T> {
    /// Registers an observer for every classified line.
    pub fn add_observer<O>(&self, observer: O) -> ObserverId
    where
        O: RainObserver + 'static,
    {
        self.shared.sink.add_observer(Arc::new(observer))
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.shared.sink.remove_observer(id)
    }

    /// Most recently published reading; all zeros before the first data report.
    pub fn latest_reading(&self) -> RainReading {
        self.shared.latest()
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.shared.sink.mode()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Blocks until a line was delivered or `timeout` elapses.
    ///
    /// Only available in [`DeliveryMode::DataReady`].
    pub fn wait_for_data(&self, timeout: Duration) -> Result<bool, RainError> {
        self.shared
            .sink
            .data_ready()
            .map(|signal| signal.wait_for_data(timeout))
            .ok_or(RainError::UnsupportedMode)
    }
}

impl<U, TX, RST, T> RainSensorParser<U, TX, RST, T>
where
    TX: RainSerialTx,
    T: RainTimer,
{
    /// Sends a command: its character followed by `\n`.
    pub fn send_command(&mut self, command: Command) -> Result<(), RainError<TX::Error>> {
        let bytes = command
            .format_into()
            .map_err(|_| RainError::InvalidCommand(command.as_byte()))?;
        self.send_command_bytes(&bytes)?;
        debug!("Sent command '{}'", command);
        Ok(())
    }

    /// Asks the sensor for a data report.
    pub fn request_data(&mut self) -> Result<(), RainError<TX::Error>> {
        self.send_command(Command::RequestData)
    }

    /// Switches the sensor to polling mode.
    pub fn polling_mode(&mut self) -> Result<(), RainError<TX::Error>> {
        self.send_command(Command::PollingMode)
    }
}

impl<U, TX, RST, T> RainSensorParser<U, TX, RST, T>
where
    RST: ResetLine,
    T: RainTimer,
{
    /// Pulses the reset line.
    ///
    /// In [`DeliveryMode::DataReady`] this also waits for the boot banner,
    /// one bounded wait per expected line, and returns how many waits saw a
    /// line. Lines that arrive together count once. Always `0` in
    /// [`DeliveryMode::EventBus`].
    pub fn reset(&mut self) -> Result<usize, RainError<RST::Error>> {
        info!("Resetting rain sensor");
        self.discard_stale_data();
        self.pulse_reset()?;
        Ok(self.await_boot_banner())
    }
}
