//! Parser for `varnishstat -j` output.
//!
//! Flat layout (Varnish 4.1 - 6.4):
//! ```text
//! {
//!     "timestamp": "2019-04-08T20:06:38",
//!     "MAIN.uptime": {"description": "...", "flag": "c", "format": "d", "value": 17276},
//!     ...
//! }
//! ```
//!
//! Nested layout (Varnish 6.5+):
//! ```text
//! {"version": 1, "timestamp": "...", "counters": {"MAIN.uptime": {...}, ...}}
//! ```
//!
//! Stats are kept in document order.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde_json::Value;

use super::ParseError;
use crate::model::{FieldValue, StatEntry, StatFormat, StatKind, StatSnapshot, StatValue};

/// Timestamp layout used by `varnishstat -j` (local time, no zone).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Top-level document with stat bodies still undecoded.
#[derive(Default)]
struct Document {
    timestamp: Option<String>,
    stats: Vec<(String, Value)>,
}

/// A JSON object whose members keep their document order.
struct Counters(Vec<(String, Value)>);

#[derive(Deserialize)]
struct RawStat {
    #[serde(default)]
    description: String,
    #[serde(default)]
    flag: String,
    #[serde(default)]
    format: String,
    #[serde(default)]
    value: Value,
}

impl<'de> Deserialize<'de> for Counters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountersVisitor;

        impl<'de> Visitor<'de> for CountersVisitor {
            type Value = Counters;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of stats")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Counters, A::Error> {
                let mut stats = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, body)) = map.next_entry::<String, Value>()? {
                    stats.push((name, body));
                }
                Ok(Counters(stats))
            }
        }

        deserializer.deserialize_map(CountersVisitor)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = Document;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a varnishstat JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Document, A::Error> {
                let mut doc = Document::default();
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "timestamp" => doc.timestamp = Some(map.next_value()?),
                        "version" => {
                            map.next_value::<IgnoredAny>()?;
                        }
                        "counters" => {
                            let Counters(stats) = map.next_value()?;
                            doc.stats.extend(stats);
                        }
                        _ => {
                            let body = map.next_value::<Value>()?;
                            doc.stats.push((key, body));
                        }
                    }
                }
                Ok(doc)
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

/// Parses `varnishstat -j` output.
pub fn parse_json(raw: &str) -> Result<StatSnapshot, ParseError> {
    let doc: Document = serde_json::from_str(raw)?;

    let timestamp = doc.timestamp.as_deref().map(parse_timestamp).transpose()?;

    let mut entries = Vec::with_capacity(doc.stats.len());
    for (name, body) in doc.stats {
        let raw: RawStat = serde_json::from_value(body).map_err(|e| ParseError::InvalidStat {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        entries.push(into_entry(name, raw));
    }

    Ok(StatSnapshot { timestamp, entries })
}

fn into_entry(name: String, raw: RawStat) -> StatEntry {
    let kind = StatKind::from_code(&raw.flag);
    let format = StatFormat::from_code(&raw.format);
    let is_flag = kind == StatKind::Bitmap || format == StatFormat::Bitmap;

    let value = match raw.value {
        Value::Bool(b) => StatValue::Flag(b),
        Value::Number(n) => match FieldValue::from_json_number(&n) {
            Some(v) if is_flag => StatValue::Flag(!v.is_zero()),
            Some(v) => StatValue::Numeric(v),
            None => StatValue::Unsupported(n.to_string()),
        },
        other => StatValue::Unsupported(other.to_string()),
    };

    StatEntry {
        name,
        description: raw.description,
        kind,
        format,
        value,
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ParseError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| ParseError::InvalidTimestamp(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::scenarios;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_small_fixture() {
        let snapshot = parse_json(scenarios::SMALL_JSON).unwrap();
        assert_eq!(snapshot.len(), 8);

        let names: Vec<&str> = snapshot.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names[0], "MAIN.uptime");
        assert_eq!(names[7], "MEMPOOL.req0.sz_wanted");

        let uptime = snapshot.get("MAIN.uptime").unwrap();
        assert_eq!(uptime.description, "Child process uptime");
        assert_eq!(uptime.kind, StatKind::Counter);
        assert_eq!(uptime.format, StatFormat::Duration);
        assert_eq!(uptime.value, StatValue::Numeric(FieldValue::Unsigned(17276)));

        let wanted = snapshot.get("MEMPOOL.req0.sz_wanted").unwrap();
        assert_eq!(wanted.kind, StatKind::Gauge);
        assert_eq!(wanted.format, StatFormat::Bytes);
    }

    #[test]
    fn test_parse_timestamp() {
        let snapshot = parse_json(scenarios::SMALL_JSON).unwrap();
        let ts = snapshot.timestamp.unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2019, 4, 8));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (20, 6, 38));
    }

    #[test]
    fn test_parse_full_fixture() {
        let snapshot = parse_json(scenarios::FULL_JSON).unwrap();
        assert_eq!(snapshot.len(), 334);

        let happy = snapshot.get("VBE.boot.default.happy").unwrap();
        assert_eq!(happy.kind, StatKind::Bitmap);
        assert_eq!(happy.value, StatValue::Flag(false));

        let flags = snapshot
            .entries
            .iter()
            .filter(|e| matches!(e.value, StatValue::Flag(_)))
            .count();
        assert_eq!(flags, 1);
    }

    #[test]
    fn test_parse_nested_layout() {
        let raw = r#"{
            "version": 1,
            "timestamp": "2021-06-17T10:57:35",
            "counters": {
                "MGT.uptime": {"description": "Management process uptime", "flag": "c", "format": "d", "value": 5},
                "MAIN.uptime": {"description": "Child process uptime", "flag": "c", "format": "d", "value": 4}
            }
        }"#;
        let snapshot = parse_json(raw).unwrap();
        assert!(snapshot.timestamp.is_some());
        let names: Vec<&str> = snapshot.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["MGT.uptime", "MAIN.uptime"]);
    }

    #[test]
    fn test_bool_value_is_flag() {
        let raw = r#"{"VBE.b.healthy": {"flag": "g", "format": "i", "value": true}}"#;
        let snapshot = parse_json(raw).unwrap();
        assert_eq!(snapshot.entries[0].value, StatValue::Flag(true));
    }

    #[test]
    fn test_bitmap_format_is_flag() {
        let raw = r#"{"VBE.b.happy": {"flag": "c", "format": "b", "value": 18446744073709551615}}"#;
        let snapshot = parse_json(raw).unwrap();
        assert_eq!(snapshot.entries[0].value, StatValue::Flag(true));
    }

    #[test]
    fn test_non_numeric_value_is_unsupported() {
        let raw = r#"{"MAIN.odd": {"flag": "c", "format": "i", "value": "many"}, "MAIN.none": {}}"#;
        let snapshot = parse_json(raw).unwrap();
        assert_eq!(
            snapshot.entries[0].value,
            StatValue::Unsupported("\"many\"".to_string())
        );
        assert_eq!(
            snapshot.entries[1].value,
            StatValue::Unsupported("null".to_string())
        );
    }

    #[test]
    fn test_negative_and_float_values() {
        let raw = r#"{"SMA.s0.g_space": {"value": -12}, "MAIN.ratio": {"value": 0.5}}"#;
        let snapshot = parse_json(raw).unwrap();
        assert_eq!(
            snapshot.entries[0].value,
            StatValue::Numeric(FieldValue::Signed(-12))
        );
        assert_eq!(
            snapshot.entries[1].value,
            StatValue::Numeric(FieldValue::Float(0.5))
        );
    }

    #[test]
    fn test_stat_body_not_an_object_is_error() {
        let err = parse_json(r#"{"MAIN.uptime": 17276}"#).unwrap_err();
        match err {
            ParseError::InvalidStat { name, .. } => assert_eq!(name, "MAIN.uptime"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_top_level_array_is_error() {
        assert!(matches!(parse_json("[1, 2]"), Err(ParseError::Json(_))));
        assert!(matches!(parse_json(""), Err(ParseError::Json(_))));
    }

    #[test]
    fn test_truncated_payload_is_error() {
        let truncated = &scenarios::FULL_JSON[..scenarios::FULL_JSON.len() / 2];
        assert!(parse_json(truncated).is_err());
    }

    #[test]
    fn test_invalid_timestamp_is_error() {
        let err = parse_json(r#"{"timestamp": "yesterday"}"#).unwrap_err();
        assert!(matches!(err, ParseError::InvalidTimestamp(_)));
    }

    #[test]
    fn test_rfc3339_timestamp() {
        let snapshot = parse_json(r#"{"timestamp": "2019-04-08T20:06:38+02:00"}"#).unwrap();
        assert_eq!(snapshot.timestamp.unwrap().hour(), 18);
        assert!(snapshot.is_empty());
    }
}
