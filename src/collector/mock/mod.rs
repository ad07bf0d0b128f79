//! Mock stat sources for testing.
//!
//! This module provides `MockSource` and captured `varnishstat` payloads for
//! exercising the collector without a running varnishd.

pub mod scenarios;

use std::io;
use std::path::Path;

use super::CollectError;
use super::source::StatSource;

#[derive(Debug, Clone)]
enum Reply {
    Output(String),
    Failure { code: Option<i32>, stderr: String },
}

/// Stat source returning the same reply on every fetch.
#[derive(Debug, Clone)]
pub struct MockSource {
    reply: Reply,
}

impl MockSource {
    /// Source returning `output` verbatim.
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            reply: Reply::Output(output.into()),
        }
    }

    /// Source behaving like a `varnishstat` that exits with `code`.
    pub fn failing(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            reply: Reply::Failure {
                code: Some(code),
                stderr: stderr.into(),
            },
        }
    }

    /// The small `varnishstat -j` capture (3 sections, 8 stats).
    pub fn small() -> Self {
        Self::new(scenarios::SMALL_JSON)
    }

    /// The full `varnishstat -j` capture (6 sections, 334 stats).
    pub fn full() -> Self {
        Self::new(scenarios::FULL_JSON)
    }

    /// Loads a captured payload from disk.
    ///
    /// Useful for regression tests against real `varnishstat` output.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }
}

impl StatSource for MockSource {
    fn fetch(&self) -> Result<String, CollectError> {
        match &self.reply {
            Reply::Output(output) => Ok(output.clone()),
            Reply::Failure { code, stderr } => Err(CollectError::ExitStatus {
                code: *code,
                stderr: stderr.clone(),
            }),
        }
    }
}
