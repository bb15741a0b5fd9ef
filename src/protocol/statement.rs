// src/protocol/statement.rs

use crate::common::StatementKind;

/// Classifies one line from the sensor by its prefix.
///
/// Prefixes are compared case-sensitively, longest first (`PwrDays`, `Event`,
/// `Acc`); the first match wins. Every input maps to exactly one kind.
pub fn classify(line: &[u8]) -> StatementKind {
    StatementKind::PREFIXES
        .iter()
        .find(|(prefix, _)| line.starts_with(prefix))
        .map(|(_, kind)| *kind)
        .unwrap_or(StatementKind::Unknown)
}
