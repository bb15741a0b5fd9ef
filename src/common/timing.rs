// src/common/timing.rs

use core::time::Duration;

// === Reset Timing ===

/// Time the reset line is held low.
pub const RESET_PULSE: Duration = Duration::from_millis(500);
/// Boot banner lines the sensor prints after a reset.
pub const BOOT_BANNER_LINES: usize = 4;

// === Inbound ===

/// Time allowed for the driver to hand over one framed line.
pub const LINE_READ_TIMEOUT: Duration = Duration::from_millis(100);
/// Default bound for a synchronous wait on the data-ready signal.
pub const DATA_WAIT_TIMEOUT: Duration = Duration::from_millis(5000);

// === Notification ===

/// Longest time the ingestion path may block posting to the event bus.
pub const POST_TIMEOUT: Duration = Duration::from_millis(100);

// === Byte Timing at 9600 Baud (8N1) ===
// 1 start bit + 8 data bits + 1 stop bit = 10 bits per byte

/// Nominal duration of a single byte at 9600 baud.
pub const BYTE_DURATION: Duration = Duration::from_micros(1042); // Approx 1.04 ms
/// Slack added on top of the nominal write time before a write times out.
pub const WRITE_SLACK: Duration = Duration::from_millis(20);
/// Time allowed for the transmitter to drain.
pub const FLUSH_TIMEOUT: Duration = Duration::from_millis(10);
