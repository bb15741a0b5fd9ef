// src/protocol/framer.rs

use log::{debug, error, warn};

use crate::common::{timing, LineSource};

/// Capacity of the working line buffer, excluding the NUL sentinel.
///
/// The longest sensor statement is well under 200 bytes.
pub const LINE_BUFFER_CAPACITY: usize = 1024;

const BUFFER_LEN: usize = LINE_BUFFER_CAPACITY + 1;
const DISCARD_CHUNK: usize = 64;

type LineBuffer = heapless::Vec<u8, BUFFER_LEN>;

/// One framed line, borrowed from the framer's working buffer.
///
/// Includes the `\n` terminator unless the line was truncated; the NUL
/// sentinel is excluded from [`RawLine::as_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLine<'a> {
    with_nul: &'a [u8],
    truncated: bool,
}

impl<'a> RawLine<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.with_nul[..self.with_nul.len() - 1]
    }

    /// Line bytes followed by the NUL sentinel.
    pub fn as_bytes_with_nul(&self) -> &'a [u8] {
        self.with_nul
    }

    /// The line was longer than the working buffer and lost its tail.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.with_nul.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Line text without trailing `\r`/`\n`, for diagnostics.
    pub fn trimmed(&self) -> &'a [u8] {
        let bytes = self.as_bytes();
        let end = bytes
            .iter()
            .rposition(|b| !matches!(b, b'\r' | b'\n'))
            .map_or(0, |i| i + 1);
        &bytes[..end]
    }
}

/// Outcome of servicing one line-boundary event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome<'a> {
    Line(RawLine<'a>),
    /// Input was discarded and no line is available for this event.
    Lost,
}

/// Cuts the driver's byte stream into lines, one per line-boundary event.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: LineBuffer,
    lines: u32,
    lost: u32,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines framed so far.
    pub fn lines(&self) -> u32 {
        self.lines
    }

    /// Line-boundary events that ended in discarded input.
    pub fn lost(&self) -> u32 {
        self.lost
    }

    /// Services one line-boundary event from the driver.
    ///
    /// Copies the next line, terminator included, into the working buffer.
    /// If the driver lost track of line boundaries all pending input is
    /// flushed and [`FrameOutcome::Lost`] is returned.
    pub fn on_pattern_detected<S: LineSource>(&mut self, source: &mut S) -> FrameOutcome<'_> {
        self.buffer.clear();

        let Some(pos) = source.pattern_pop_pos() else {
            warn!("Pattern queue size too small, flushing input");
            if let Err(e) = source.flush_input() {
                error!("Flushing UART input failed: {:?}", e);
            }
            self.lost += 1;
            return FrameOutcome::Lost;
        };

        let line_len = pos + 1;
        let wanted = line_len.min(LINE_BUFFER_CAPACITY);
        // wanted never exceeds LINE_BUFFER_CAPACITY, leaving room for the sentinel
        let _ = self.buffer.resize(wanted, 0);

        let read = match source.read_bytes(&mut self.buffer, timing::LINE_READ_TIMEOUT) {
            Ok(n) => n.min(wanted),
            Err(e) => {
                error!("Reading line from UART failed: {:?}", e);
                self.buffer.clear();
                self.lost += 1;
                return FrameOutcome::Lost;
            }
        };
        self.buffer.truncate(read);

        let truncated = line_len > wanted;
        if truncated {
            warn!(
                "Line of {} bytes exceeds the {} byte buffer, tail discarded",
                line_len, LINE_BUFFER_CAPACITY
            );
            Self::discard(source, line_len - wanted);
        }

        let _ = self.buffer.push(0);
        self.lines = self.lines.wrapping_add(1);
        debug!("Framed line of {} bytes", read);

        FrameOutcome::Line(RawLine {
            with_nul: &self.buffer[..],
            truncated,
        })
    }

    /// Reads and drops `remaining` bytes so the next event starts on a line boundary.
    fn discard<S: LineSource>(source: &mut S, mut remaining: usize) {
        let mut scratch = [0u8; DISCARD_CHUNK];
        while remaining > 0 {
            let chunk = remaining.min(DISCARD_CHUNK);
            match source.read_bytes(&mut scratch[..chunk], timing::LINE_READ_TIMEOUT) {
                Ok(0) => break,
                Ok(n) => remaining = remaining.saturating_sub(n),
                Err(e) => {
                    error!("Discarding line tail failed: {:?}", e);
                    break;
                }
            }
        }
    }
}
