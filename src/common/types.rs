// src/common/types.rs

use core::fmt;

// --- Rain Figures (`Acc` report) ---

/// The four figures carried by one `Acc` data report, in millimetres.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct RainReading {
    /// Current accumulator of rain (mm).
    pub current_accumulated_mm: f32,
    /// Rain event accumulator (mm).
    pub event_accumulated_mm: f32,
    /// Total rainfall since the last sensor reset (mm).
    pub total_mm: f32,
    /// Predicted rain rate for the current event (mm/h).
    pub rate_mm_per_hour: f32,
}

impl RainReading {
    /// Number of positional fields in a data report.
    pub const FIELD_COUNT: usize = 4;

    /// Writes `value` into the field at report position `index`.
    ///
    /// Positions past the fourth are ignored and return `false`.
    pub fn set_field(&mut self, index: usize, value: f32) -> bool {
        match index {
            0 => self.current_accumulated_mm = value,
            1 => self.event_accumulated_mm = value,
            2 => self.total_mm = value,
            3 => self.rate_mm_per_hour = value,
            _ => return false,
        }
        true
    }
}

impl fmt::Display for RainReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Accumulator = {:.02}mm, Event Accu = {:.02}mm, Total Rain = {:.02}mm, mm per hour = {:.02}mmph",
            self.current_accumulated_mm, self.event_accumulated_mm, self.total_mm, self.rate_mm_per_hour
        )
    }
}

// --- Statement Grammar ---

/// Kind of statement a line from the sensor represents.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StatementKind {
    /// `PwrDays...` - the sensor finished a reboot/reset.
    RebootComplete,
    /// `Event...` - a rain event started.
    RainEvent,
    /// `Acc ...` - accumulated-data report.
    DataReport,
    /// Anything else.
    Unknown,
}

impl StatementKind {
    /// Line prefix for each recognised statement, in matching priority order.
    pub const PREFIXES: [(&'static [u8], StatementKind); 3] = [
        (b"PwrDays", StatementKind::RebootComplete),
        (b"Event", StatementKind::RainEvent),
        (b"Acc", StatementKind::DataReport),
    ];
}
