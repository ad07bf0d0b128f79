//! Decoders for raw `varnishstat` output.
//!
//! Two formats are understood:
//! - [`InputFormat::Json`] - `varnishstat -j`, both the flat layout of
//!   Varnish 4.1-6.4 and the `{"version": 1, "counters": {...}}` layout
//!   introduced in 6.5,
//! - [`InputFormat::Text`] - `varnishstat -1`, one stat per line.
//!
//! A payload that cannot be decoded is a [`ParseError`] and fails the whole
//! cycle. A single stat whose value is neither numeric nor a flag is kept as
//! [`StatValue::Unsupported`](crate::model::StatValue) and dealt with by the
//! regrouper.

mod json;
mod text;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::StatSnapshot;

pub use json::parse_json;
pub use text::parse_text;

/// Error decoding a `varnishstat` payload.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed stat {name}: {reason}")]
    InvalidStat { name: String, reason: String },
    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),
}

/// Output format requested from `varnishstat`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    #[default]
    Json,
    Text,
}

impl InputFormat {
    /// Command-line flag selecting this format in `varnishstat`.
    pub fn varnishstat_flag(self) -> &'static str {
        match self {
            InputFormat::Json => "-j",
            InputFormat::Text => "-1",
        }
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(InputFormat::Json),
            "text" => Ok(InputFormat::Text),
            other => Err(format!("unknown input format '{}' (json, text)", other)),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Json => f.write_str("json"),
            InputFormat::Text => f.write_str("text"),
        }
    }
}

/// Decodes `raw` according to `format`.
pub fn parse(raw: &str, format: InputFormat) -> Result<StatSnapshot, ParseError> {
    match format {
        InputFormat::Json => parse_json(raw),
        InputFormat::Text => Ok(parse_text(raw)),
    }
}
