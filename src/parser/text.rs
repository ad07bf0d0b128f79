//! Parser for `varnishstat -1` output.
//!
//! Format: one stat per line, whitespace separated
//! `NAME VALUE RATE DESCRIPTION...`, e.g.
//! `MAIN.uptime            17276         1.00 Child process uptime`.
//! The rate column is `.` for gauges.

use crate::model::{FieldValue, StatEntry, StatFormat, StatKind, StatSnapshot, StatValue};

/// Parses `varnishstat -1` output.
///
/// Lines with fewer than two columns or without a dotted name are skipped.
/// The text format carries neither flag nor format hints, nor a timestamp.
pub fn parse_text(raw: &str) -> StatSnapshot {
    let mut entries = Vec::new();

    for line in raw.lines() {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            continue;
        };
        let Some(value) = parts.next() else {
            continue;
        };
        if !name.contains('.') {
            continue;
        }

        // Rate column.
        parts.next();
        let description = parts.collect::<Vec<_>>().join(" ");

        entries.push(StatEntry {
            name: name.to_string(),
            description,
            kind: StatKind::Unknown,
            format: StatFormat::Unknown,
            value: parse_value(value),
        });
    }

    StatSnapshot {
        timestamp: None,
        entries,
    }
}

fn parse_value(s: &str) -> StatValue {
    if let Ok(v) = s.parse::<u64>() {
        StatValue::Numeric(FieldValue::Unsigned(v))
    } else if let Ok(v) = s.parse::<i64>() {
        StatValue::Numeric(FieldValue::Signed(v))
    } else {
        StatValue::Unsupported(s.to_string())
    }
}
