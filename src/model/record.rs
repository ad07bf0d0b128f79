//! Tagged measurement records handed to a sink.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::stat::FieldValue;

/// Measurement name of every emitted record.
pub const MEASUREMENT: &str = "varnish";

/// Tag key holding the section of the stats that fed a record.
pub const SECTION_TAG: &str = "section";

/// One emitted measurement: all selected stats of a single section.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct Record {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    /// Unset until the collector stamps the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Record {
    /// Creates an empty record tagged with `section`.
    pub fn new(section: &str) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert(SECTION_TAG.to_string(), section.to_string());
        Self {
            measurement: MEASUREMENT.to_string(),
            tags,
            fields: BTreeMap::new(),
            timestamp: None,
        }
    }

    pub fn section(&self) -> &str {
        self.tags.get(SECTION_TAG).map(String::as_str).unwrap_or_default()
    }

    pub fn field(&self, key: &str) -> Option<FieldValue> {
        self.fields.get(key).copied()
    }

    /// Adds a tag unless the key is already present.
    ///
    /// Returns `false` when the tag was not added.
    pub fn add_tag(&mut self, key: &str, value: &str) -> bool {
        if self.tags.contains_key(key) {
            return false;
        }
        self.tags.insert(key.to_string(), value.to_string());
        true
    }
}
