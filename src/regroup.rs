//! Regrouping of selected stats into per-section records.
//!
//! `MEMPOOL.req0.live` becomes field `req0.live` of the record tagged
//! `section=MEMPOOL`. Records come out in the order their section was first
//! seen in the snapshot.

use std::collections::HashMap;
use std::fmt;

use crate::filter::StatFilter;
use crate::model::{Record, StatSnapshot, StatValue};

/// A stat skipped during regrouping because its value could not be used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub stat: String,
    pub reason: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stat, self.reason)
    }
}

/// Output of [`process`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Regrouped {
    pub records: Vec<Record>,
    pub diagnostics: Vec<Diagnostic>,
    /// Number of stats that passed the filter, including dropped ones.
    pub selected: usize,
}

impl Regrouped {
    /// Total number of fields across all records.
    pub fn field_count(&self) -> usize {
        self.records.iter().map(|r| r.fields.len()).sum()
    }

    pub fn record(&self, section: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.section() == section)
    }
}

/// Filters `snapshot` and groups the surviving numeric stats by section.
///
/// Flag stats are dropped without a diagnostic. Stats with an unsupported
/// value are dropped with one. A section is only emitted once it holds at
/// least one field.
pub fn process(snapshot: &StatSnapshot, filter: &StatFilter) -> Regrouped {
    let mut out = Regrouped::default();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for entry in &snapshot.entries {
        if !filter.matches(&entry.name) {
            continue;
        }
        out.selected += 1;

        let value = match &entry.value {
            StatValue::Numeric(v) => *v,
            StatValue::Flag(_) => continue,
            StatValue::Unsupported(raw) => {
                out.diagnostics.push(Diagnostic {
                    stat: entry.name.clone(),
                    reason: format!("expected a numeric value, got {}", raw),
                });
                continue;
            }
        };

        let (section, field) = entry.split_name();
        let slot = *index.entry(section).or_insert_with(|| {
            out.records.push(Record::new(section));
            out.records.len() - 1
        });
        out.records[slot].fields.insert(field.to_string(), value);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::scenarios;
    use crate::model::{FieldValue, StatEntry};

    fn snapshot(entries: Vec<StatEntry>) -> StatSnapshot {
        StatSnapshot {
            timestamp: None,
            entries,
        }
    }

    #[test]
    fn test_small_fixture_all_stats() {
        let out = process(&scenarios::small_snapshot(), &StatFilter::all());

        let sections: Vec<&str> = out.records.iter().map(|r| r.section()).collect();
        assert_eq!(sections, vec!["MAIN", "MGT", "MEMPOOL"]);

        let mempool = out.record("MEMPOOL").unwrap();
        assert_eq!(mempool.fields.len(), 3);
        assert_eq!(mempool.field("req0.live"), Some(FieldValue::Unsigned(0)));
        assert_eq!(mempool.field("req0.pool"), Some(FieldValue::Unsigned(10)));
        assert_eq!(
            mempool.field("req0.sz_wanted"),
            Some(FieldValue::Unsigned(65536))
        );

        let main = out.record("MAIN").unwrap();
        assert_eq!(main.field("uptime"), Some(FieldValue::Unsigned(17276)));
        assert_eq!(main.field("cache_hit"), Some(FieldValue::Unsigned(4144)));
        assert_eq!(main.field("cache_miss"), Some(FieldValue::Unsigned(600)));

        let mgt = out.record("MGT").unwrap();
        assert_eq!(mgt.field("uptime"), Some(FieldValue::Unsigned(17275)));
        assert_eq!(mgt.field("child_start"), Some(FieldValue::Unsigned(1)));
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_small_fixture_single_stat() {
        let out = process(
            &scenarios::small_snapshot(),
            &StatFilter::compile(["MAIN.uptime"]),
        );
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.field_count(), 1);
        let main = &out.records[0];
        assert_eq!(main.section(), "MAIN");
        assert_eq!(main.field("uptime"), Some(FieldValue::Unsigned(17276)));
    }

    #[test]
    fn test_full_fixture_field_config() {
        let full = scenarios::full_snapshot();
        let cases: [(&[&str], usize); 4] = [
            (&["*"], 333),
            (&[""], 0),
            (&["MAIN.uptime"], 1),
            (&["MEMPOOL.sess1.sz_actual", "MAIN.fetch_bad"], 2),
        ];
        for (patterns, expected) in cases {
            let out = process(&full, &StatFilter::compile(patterns));
            assert_eq!(out.field_count(), expected, "patterns {:?}", patterns);
        }
    }

    #[test]
    fn test_full_fixture_sections() {
        let out = process(&scenarios::full_snapshot(), &StatFilter::all());
        let sections: Vec<&str> = out.records.iter().map(|r| r.section()).collect();
        assert_eq!(sections, vec!["MGT", "MAIN", "LCK", "MEMPOOL", "SMA", "VBE"]);
        assert_eq!(out.selected, 334);
    }

    #[test]
    fn test_full_fixture_section_filters() {
        let out = process(
            &scenarios::full_snapshot(),
            &StatFilter::compile(["MGT.*", "VBE.*"]),
        );
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.field_count(), 26);
        assert_eq!(out.record("MGT").unwrap().fields.len(), 7);
        assert_eq!(out.record("VBE").unwrap().fields.len(), 19);
    }

    #[test]
    fn test_flag_stats_are_dropped() {
        let out = process(
            &scenarios::full_snapshot(),
            &StatFilter::compile(["VBE.boot.default.happy", "VBE.boot.default.conn"]),
        );
        assert_eq!(out.selected, 2);
        assert_eq!(out.field_count(), 1);
        let vbe = out.record("VBE").unwrap();
        assert!(vbe.field("boot.default.happy").is_none());
        assert!(vbe.field("boot.default.conn").is_some());
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_section_with_only_flags_emits_nothing() {
        let mut entry = StatEntry::numeric("VBE.boot.default.happy", 0u64);
        entry.value = StatValue::Flag(false);
        let out = process(&snapshot(vec![entry]), &StatFilter::all());
        assert!(out.records.is_empty());
        assert_eq!(out.selected, 1);
    }

    #[test]
    fn test_unsupported_value_is_skipped_with_diagnostic() {
        let mut bad = StatEntry::numeric("MAIN.weird", 0u64);
        bad.value = StatValue::Unsupported("\"n/a\"".to_string());
        let entries = vec![
            StatEntry::numeric("MAIN.uptime", 10u64),
            bad,
            StatEntry::numeric("MAIN.cache_hit", 3u64),
        ];
        let out = process(&snapshot(entries), &StatFilter::all());

        assert_eq!(out.field_count(), 2);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].stat, "MAIN.weird");
        assert!(out.diagnostics[0].to_string().contains("n/a"));
    }

    #[test]
    fn test_unselected_stats_contribute_nothing() {
        let entries = vec![
            StatEntry::numeric("MAIN.uptime", 10u64),
            StatEntry::numeric("MAIN.uptime2", 11u64),
            StatEntry::numeric("MGTX.uptime", 12u64),
        ];
        let out = process(
            &snapshot(entries),
            &StatFilter::compile(["MAIN.uptime", "MGT.*"]),
        );
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].fields.len(), 1);
        assert_eq!(out.selected, 1);
    }

    #[test]
    fn test_single_segment_name_uses_full_name() {
        let entries = vec![StatEntry::numeric("uptime", 5u64)];
        let out = process(&snapshot(entries), &StatFilter::all());
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].section(), "uptime");
        assert_eq!(out.records[0].field("uptime"), Some(FieldValue::Unsigned(5)));
    }

    #[test]
    fn test_distinct_names_keep_distinct_fields() {
        let full = scenarios::full_snapshot();
        let out = process(&full, &StatFilter::all());
        for entry in &full.entries {
            if let StatValue::Numeric(v) = entry.value {
                let (section, field) = entry.split_name();
                assert_eq!(out.record(section).unwrap().field(field), Some(v));
            }
        }
    }

    #[test]
    fn test_process_is_idempotent() {
        let full = scenarios::full_snapshot();
        let filter = StatFilter::compile(["MAIN.*", "LCK.sma.*"]);
        assert_eq!(process(&full, &filter), process(&full, &filter));
    }

    #[test]
    fn test_empty_filter_yields_empty_output() {
        let out = process(&scenarios::full_snapshot(), &StatFilter::compile([""; 0]));
        assert!(out.records.is_empty());
        assert_eq!(out.selected, 0);
    }
}
