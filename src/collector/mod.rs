//! Varnish stat collection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Collector                           │
//! │                                                              │
//! │   StatSource ──raw──▶ parser ──StatSnapshot──▶ regroup       │
//! │   (trait)                             ▲          │           │
//! │                                  StatFilter      ▼           │
//! │                                             CycleReport      │
//! └──────┬───────────────────────────────────────────────────────┘
//!        │
//!   ┌────┴──────────────┐
//!   │                   │
//! ┌─▼───────────┐ ┌─────▼──────┐
//! │ VarnishStat │ │ MockSource │
//! │ (process)   │ │ (fixtures) │
//! └─────────────┘ └────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use vstat::collector::{Collector, CollectorConfig, MockSource};
//! use vstat::filter::StatFilter;
//!
//! let config = CollectorConfig::new(StatFilter::compile(["MAIN.*"]));
//! let collector = Collector::new(MockSource::small(), config);
//! let report = collector.collect().unwrap();
//! assert_eq!(report.records.len(), 1);
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod mock;
pub mod source;

use std::time::Duration;

use crate::parser::ParseError;

pub use collector::{Collector, CollectorConfig, CycleReport};
pub use mock::MockSource;
pub use source::{StatSource, VarnishStat};

/// Error that fails a whole collection cycle.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("varnishstat timed out after {0:?}")]
    Timeout(Duration),
    #[error("varnishstat exited with {}: {stderr}", exit_code(.code))]
    ExitStatus { code: Option<i32>, stderr: String },
    #[error("varnishstat output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode varnishstat output: {0}")]
    Parse(#[from] ParseError),
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "signal".to_string(),
    }
}
