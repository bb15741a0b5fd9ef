//! Inbound protocol: line framing, statement classification and field extraction.
//!
//! The sensor prints ASCII lines terminated by `\n`:
//!
//! - `PwrDays...` after a reboot/reset,
//! - `Event...` when a rain event starts,
//! - `Acc <current> <event> <total> <rate> ...` as a data report,
//! - anything else is surfaced as an unknown statement.

pub mod fields;
pub mod framer;
pub mod statement;

pub use fields::{extract_fields, parse_decimal, ExtractedReport, FIELD_TEXT_CAPACITY};
pub use framer::{FrameOutcome, LineFramer, RawLine, LINE_BUFFER_CAPACITY};
pub use statement::classify;
