//! vstat - Varnish stat selection and regrouping library.
//!
//! Provides:
//! - `filter` - pattern-based stat selection (`*`, `SECTION.*`, exact names)
//! - `regroup` - grouping of selected stats into per-section records
//! - `parser` - decoders for `varnishstat -j` and `varnishstat -1` output
//! - `collector` - one fetch/parse/select/regroup cycle over a stat source
//! - `output` - record sinks (InfluxDB line protocol, JSON lines)
//! - `config` - TOML configuration for the `vstatd` daemon
//! - `model` - shared data models

pub mod collector;
pub mod config;
pub mod filter;
pub mod model;
pub mod output;
pub mod parser;
pub mod regroup;
