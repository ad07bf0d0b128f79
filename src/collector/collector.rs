//! One collection cycle: fetch, decode, select, regroup.
//!
//! The `Collector` struct owns a [`StatSource`] and the cycle settings, and
//! turns each `varnishstat` run into a [`CycleReport`].

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::CollectError;
use super::source::StatSource;
use crate::filter::StatFilter;
use crate::model::Record;
use crate::parser::{self, InputFormat};
use crate::regroup::{self, Diagnostic};

/// Settings applied to every cycle.
#[derive(Debug, Clone, Default)]
pub struct CollectorConfig {
    /// Which stats to keep.
    pub filter: StatFilter,
    /// How to decode the source output.
    pub input_format: InputFormat,
    /// Extra tags added to every record. `section` is never overridden.
    pub tags: BTreeMap<String, String>,
}

impl CollectorConfig {
    pub fn new(filter: StatFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn with_input_format(mut self, format: InputFormat) -> Self {
        self.input_format = format;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Result of one successful cycle.
///
/// An empty `records` list is a valid outcome: the filter selected nothing.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub records: Vec<Record>,
    pub diagnostics: Vec<Diagnostic>,
    /// Stats present in the source output.
    pub stats_seen: usize,
    /// Stats that passed the filter, before flags and bad values were dropped.
    pub stats_selected: usize,
    /// Time every record was stamped with.
    pub collected_at: DateTime<Utc>,
    /// Timestamp reported by `varnishstat`, when the format has one.
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Wall time spent on the cycle, including the source call.
    pub duration: Duration,
}

impl CycleReport {
    pub fn field_count(&self) -> usize {
        self.records.iter().map(|r| r.fields.len()).sum()
    }
}

/// Collector for a single varnishd instance.
pub struct Collector<S: StatSource> {
    source: S,
    config: CollectorConfig,
}

impl<S: StatSource> Collector<S> {
    pub fn new(source: S, config: CollectorConfig) -> Self {
        if config.filter.is_empty() {
            warn!("stat filter selects nothing; every cycle will be empty");
        }
        Self { source, config }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Runs one cycle.
    ///
    /// Fails only when the source fails or its output cannot be decoded.
    /// Individual stats with unusable values are reported as diagnostics.
    pub fn collect(&self) -> Result<CycleReport, CollectError> {
        let started = Instant::now();

        let raw = self.source.fetch()?;
        let snapshot = parser::parse(&raw, self.config.input_format)?;
        let regrouped = regroup::process(&snapshot, &self.config.filter);

        let collected_at = Utc::now();
        let mut records = regrouped.records;
        for record in &mut records {
            record.timestamp = Some(collected_at);
            for (key, value) in &self.config.tags {
                record.add_tag(key, value);
            }
        }

        for diagnostic in &regrouped.diagnostics {
            warn!("skipped stat {}", diagnostic);
        }

        let report = CycleReport {
            records,
            diagnostics: regrouped.diagnostics,
            stats_seen: snapshot.len(),
            stats_selected: regrouped.selected,
            collected_at,
            source_timestamp: snapshot.timestamp,
            duration: started.elapsed(),
        };

        debug!(
            "cycle: {} stats, {} selected, {} records, {} fields in {:?}",
            report.stats_seen,
            report.stats_selected,
            report.records.len(),
            report.field_count(),
            report.duration
        );

        Ok(report)
    }
}
