//! Data models shared by the parser, regrouper and sinks.

mod record;
mod stat;

pub use record::{MEASUREMENT, Record, SECTION_TAG};
pub use stat::{FieldValue, StatEntry, StatFormat, StatKind, StatSnapshot, StatValue};
