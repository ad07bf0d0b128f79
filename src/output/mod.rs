//! Record sinks.
//!
//! - [`LineProtocolWriter`] - InfluxDB line protocol, one line per record,
//! - [`JsonLinesWriter`] - one JSON object per record.
//!
//! Both write to any `io::Write` and flush after every batch.

mod json_lines;
mod line_protocol;

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::Record;

pub use json_lines::JsonLinesWriter;
pub use line_protocol::{LineProtocolWriter, format_line};

/// Consumer of the records produced by a cycle.
pub trait RecordSink {
    fn write(&mut self, records: &[Record]) -> io::Result<()>;
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn write(&mut self, records: &[Record]) -> io::Result<()> {
        (**self).write(records)
    }
}

/// Encoding used by a sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// InfluxDB line protocol.
    #[default]
    Line,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line" => Ok(OutputFormat::Line),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}' (line, json)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Line => f.write_str("line"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// Wraps `writer` in the sink for `format`.
pub fn sink_for<W: Write + 'static>(format: OutputFormat, writer: W) -> Box<dyn RecordSink> {
    match format {
        OutputFormat::Line => Box::new(LineProtocolWriter::new(writer)),
        OutputFormat::Json => Box::new(JsonLinesWriter::new(writer)),
    }
}

/// Opens a sink writing to `path`, or to stdout when `path` is `None` or `-`.
///
/// Files are opened for appending and created when missing.
pub fn open(format: OutputFormat, path: Option<&Path>) -> io::Result<Box<dyn RecordSink>> {
    match path {
        Some(p) if p != Path::new("-") => {
            let file = OpenOptions::new().create(true).append(true).open(p)?;
            Ok(sink_for(format, BufWriter::new(file)))
        }
        _ => Ok(sink_for(format, io::stdout())),
    }
}
