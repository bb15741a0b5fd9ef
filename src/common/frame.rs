// src/common/frame.rs

/// Serial link parameters for the rain sensor UART.
///
/// The defaults are fixed by the sensor firmware: 9600 baud, 8 data bits,
/// no parity, 1 stop bit, no flow control. Changing them needs a matching
/// change on the device.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LinkConfig {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub hw_flow_control: bool,
    /// Byte the driver watches for to mark a line boundary.
    pub line_terminator: u8,
    /// Driver receive ring buffer size in bytes.
    pub rx_buffer_len: usize,
    /// Number of terminator positions the driver can queue before dropping.
    pub pattern_queue_len: usize,
    /// Depth of the driver event queue.
    pub event_queue_len: usize,
}

impl LinkConfig {
    pub const BAUD_RATE: u32 = 9600;
    pub const LINE_TERMINATOR: u8 = b'\n';
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            baud_rate: Self::BAUD_RATE,
            data_bits: 8,
            stop_bits: 1,
            hw_flow_control: false,
            line_terminator: Self::LINE_TERMINATOR,
            rx_buffer_len: crate::protocol::framer::LINE_BUFFER_CAPACITY,
            pattern_queue_len: 16,
            event_queue_len: 16,
        }
    }
}
