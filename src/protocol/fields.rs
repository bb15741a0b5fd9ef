// src/protocol/fields.rs

use arrayvec::ArrayVec;
use log::{debug, warn};

use crate::common::RainReading;

/// Longest numeric field kept from a data report; longer text is truncated.
pub const FIELD_TEXT_CAPACITY: usize = 15;

type FieldText = ArrayVec<u8, FIELD_TEXT_CAPACITY>;

/// Result of walking one `Acc` line.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ExtractedReport {
    /// The reading after applying every field found on the line.
    pub reading: RainReading,
    /// Number of numeric fields found, capped at [`RainReading::FIELD_COUNT`].
    pub fields: usize,
}

impl ExtractedReport {
    pub fn is_complete(&self) -> bool {
        self.fields == RainReading::FIELD_COUNT
    }
}

/// Extracts the four positional rain figures from a data report line.
///
/// A field starts at the first digit after the previous field (a `+`/`-`
/// directly in front of that digit belongs to the field) and runs to the next
/// space. Text left open at the end of the line, with no space after it, is
/// not a field. Fields map in order to current, event, total and rate. Fields
/// missing from the line keep their value from `previous`; fields beyond the
/// fourth are ignored.
///
/// The result is built in a scratch copy so the caller can publish it in one
/// assignment.
pub fn extract_fields(line: &[u8], previous: RainReading) -> ExtractedReport {
    let mut reading = previous;
    let mut fields = 0;
    let mut start: Option<usize> = None;

    for (i, &byte) in line.iter().enumerate() {
        match start {
            None if byte.is_ascii_digit() => start = Some(field_start(line, i)),
            Some(s) if is_field_end(byte) => {
                store_field(&mut reading, &mut fields, &line[s..i]);
                start = None;
            }
            _ => {}
        }
    }

    if fields < RainReading::FIELD_COUNT {
        debug!(
            "Data report carried {} of {} fields, keeping previous values",
            fields,
            RainReading::FIELD_COUNT
        );
    }

    ExtractedReport { reading, fields }
}

/// Converts decimal text the way C's `atof` does, without locale.
///
/// The longest prefix of the form `[+-]digits[.digits]` is converted. Text
/// with no such prefix yields `0.0`.
pub fn parse_decimal(text: &[u8]) -> f32 {
    let len = text.len();
    let mut end = 0;
    if matches!(text.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < len && text[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < len && text[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < len && text[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return 0.0;
    }

    core::str::from_utf8(&text[..end])
        .ok()
        .and_then(|s| s.parse::<f32>().ok())
        .unwrap_or(0.0)
}

/// Only a space closes a field; tabs and line terminators stay inside it.
#[inline]
fn is_field_end(byte: u8) -> bool {
    byte == b' '
}

/// Moves a field start back over a sign that sits at a word boundary.
fn field_start(line: &[u8], digit_pos: usize) -> usize {
    if digit_pos == 0 || !matches!(line[digit_pos - 1], b'+' | b'-') {
        return digit_pos;
    }
    let sign_pos = digit_pos - 1;
    if sign_pos == 0 || is_field_end(line[sign_pos - 1]) {
        sign_pos
    } else {
        digit_pos
    }
}

fn store_field(reading: &mut RainReading, fields: &mut usize, span: &[u8]) {
    if *fields >= RainReading::FIELD_COUNT {
        return;
    }

    let mut text = FieldText::new();
    for &byte in span {
        if text.try_push(byte).is_err() {
            warn!(
                "Field {} is {} bytes long, truncated to {}",
                *fields,
                span.len(),
                FIELD_TEXT_CAPACITY
            );
            break;
        }
    }

    reading.set_field(*fields, parse_decimal(&text));
    *fields += 1;
}
