//! InfluxDB line protocol encoding.
//!
//! `varnish,section=MEMPOOL req0.live=0u,req0.pool=10u 1554753998000000000`
//!
//! Tags and fields are written in key order. Unsigned integers carry the `u`
//! suffix, signed integers `i`, floats none. Non-finite floats cannot be
//! represented and are left out.

use std::fmt::Write as _;
use std::io::{self, Write};

use super::RecordSink;
use crate::model::{FieldValue, Record};

/// Sink writing one line-protocol line per record.
pub struct LineProtocolWriter<W: Write> {
    writer: W,
}

impl<W: Write> LineProtocolWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for LineProtocolWriter<W> {
    fn write(&mut self, records: &[Record]) -> io::Result<()> {
        for record in records {
            if let Some(line) = format_line(record) {
                writeln!(self.writer, "{}", line)?;
            }
        }
        self.writer.flush()
    }
}

/// Encodes one record, or `None` when it has no representable field.
pub fn format_line(record: &Record) -> Option<String> {
    let mut fields = String::new();
    for (key, value) in &record.fields {
        let Some(encoded) = encode_value(value) else {
            continue;
        };
        if !fields.is_empty() {
            fields.push(',');
        }
        escape_into(&mut fields, key, KEY_SPECIALS);
        fields.push('=');
        fields.push_str(&encoded);
    }
    if fields.is_empty() {
        return None;
    }

    let mut line = String::with_capacity(fields.len() + 64);
    escape_into(&mut line, &record.measurement, MEASUREMENT_SPECIALS);
    for (key, value) in &record.tags {
        if value.is_empty() {
            continue;
        }
        line.push(',');
        escape_into(&mut line, key, KEY_SPECIALS);
        line.push('=');
        escape_into(&mut line, value, KEY_SPECIALS);
    }
    line.push(' ');
    line.push_str(&fields);

    if let Some(nanos) = record.timestamp.and_then(|ts| ts.timestamp_nanos_opt()) {
        let _ = write!(line, " {}", nanos);
    }

    Some(line)
}

const MEASUREMENT_SPECIALS: &[char] = &[',', ' '];
const KEY_SPECIALS: &[char] = &[',', '=', ' '];

fn escape_into(out: &mut String, s: &str, specials: &[char]) {
    for c in s.chars() {
        if specials.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

fn encode_value(value: &FieldValue) -> Option<String> {
    match *value {
        FieldValue::Unsigned(v) => Some(format!("{}u", v)),
        FieldValue::Signed(v) => Some(format!("{}i", v)),
        FieldValue::Float(v) if v.is_finite() => Some(format!("{}", v)),
        FieldValue::Float(_) => None,
    }
}
