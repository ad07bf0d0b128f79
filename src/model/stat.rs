//! Raw stat observations as decoded from `varnishstat` output.
//!
//! A [`StatEntry`] is produced by the parser and consumed by the regrouper
//! within a single polling cycle.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric payload of a stat, and of a record field.
///
/// `varnishstat` emits unsigned 64-bit counters and gauges; the other
/// variants exist for sources that report signed or fractional values.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl FieldValue {
    /// Converts a JSON number, preferring the narrowest exact representation.
    pub fn from_json_number(n: &serde_json::Number) -> Option<Self> {
        if let Some(v) = n.as_u64() {
            Some(FieldValue::Unsigned(v))
        } else if let Some(v) = n.as_i64() {
            Some(FieldValue::Signed(v))
        } else {
            n.as_f64().map(FieldValue::Float)
        }
    }

    /// Returns `true` when the value is zero in its own representation.
    pub fn is_zero(&self) -> bool {
        match *self {
            FieldValue::Unsigned(v) => v == 0,
            FieldValue::Signed(v) => v == 0,
            FieldValue::Float(v) => v == 0.0,
        }
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Unsigned(v)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unsigned(v) => write!(f, "{}", v),
            FieldValue::Signed(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Value of a stat after the parser has classified it.
#[derive(Clone, Debug, PartialEq)]
pub enum StatValue {
    /// A counter or gauge reading.
    Numeric(FieldValue),
    /// A boolean / health-probe bitmap. Carries no numeric field.
    Flag(bool),
    /// Any payload that is neither numeric nor a flag. Holds the raw text.
    Unsupported(String),
}

/// The `flag` discriminator reported by `varnishstat`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StatKind {
    /// `c`
    Counter,
    /// `g`
    Gauge,
    /// `b`
    Bitmap,
    /// Anything else, including the text format where no flag is reported.
    #[default]
    Unknown,
}

impl StatKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "c" => StatKind::Counter,
            "g" => StatKind::Gauge,
            "b" => StatKind::Bitmap,
            _ => StatKind::Unknown,
        }
    }
}

/// The `format` hint reported by `varnishstat`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StatFormat {
    /// `i` - plain integer.
    Integer,
    /// `B` - byte count.
    Bytes,
    /// `d` - duration in seconds.
    Duration,
    /// `b` - bitmap.
    Bitmap,
    #[default]
    Unknown,
}

impl StatFormat {
    pub fn from_code(code: &str) -> Self {
        match code {
            "i" => StatFormat::Integer,
            "B" => StatFormat::Bytes,
            "d" => StatFormat::Duration,
            "b" => StatFormat::Bitmap,
            _ => StatFormat::Unknown,
        }
    }
}

/// One raw observation.
#[derive(Clone, Debug, PartialEq)]
pub struct StatEntry {
    /// Dotted stat name, e.g. `MEMPOOL.req0.live`.
    pub name: String,
    pub description: String,
    pub kind: StatKind,
    pub format: StatFormat,
    pub value: StatValue,
}

impl StatEntry {
    /// Creates a numeric entry with unknown flag and format.
    pub fn numeric(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind: StatKind::Unknown,
            format: StatFormat::Unknown,
            value: StatValue::Numeric(value.into()),
        }
    }

    /// Section (first dotted segment) and residual path of the name.
    ///
    /// A name without a dot is its own section and its own field key.
    pub fn split_name(&self) -> (&str, &str) {
        match self.name.split_once('.') {
            Some((section, rest)) => (section, rest),
            None => (&self.name, &self.name),
        }
    }
}

/// A decoded `varnishstat` payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatSnapshot {
    /// Time reported by `varnishstat`, if the format carries one.
    pub timestamp: Option<DateTime<Utc>>,
    /// Entries in document order.
    pub entries: Vec<StatEntry>,
}

impl StatSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&StatEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}
