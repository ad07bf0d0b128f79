//! Collector configuration.
//!
//! Loaded from an optional TOML file; every key is optional:
//!
//! ```toml
//! stats = ["MAIN.*", "MGT.uptime"]
//! binary = "/usr/bin/varnishstat"
//! use_sudo = false
//! instance_name = "edge1"
//! timeout = "1s"
//! interval = "10s"
//! input_format = "json"
//! output_format = "line"
//! output = "/var/lib/vstat/varnish.lp"
//!
//! [tags]
//! dc = "ams1"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collector::{CollectorConfig, VarnishStat};
use crate::filter::StatFilter;
use crate::model::SECTION_TAG;
use crate::output::OutputFormat;
use crate::parser::InputFormat;

/// Stats collected when no `stats` list is configured.
pub const DEFAULT_STATS: &[&str] = &["MAIN.cache_hit", "MAIN.cache_miss", "MAIN.uptime"];

/// Error loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Stat selection patterns.
    pub stats: Vec<String>,
    /// Path to `varnishstat`.
    pub binary: PathBuf,
    /// Run `varnishstat` through `sudo -n`.
    pub use_sudo: bool,
    /// varnishd instance name (`varnishstat -n`).
    pub instance_name: Option<String>,
    /// Maximum run time of one `varnishstat` call.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Delay between cycles.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    pub input_format: InputFormat,
    pub output_format: OutputFormat,
    /// Output file; stdout when unset or `-`.
    pub output: Option<PathBuf>,
    /// Extra tags added to every record.
    pub tags: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stats: DEFAULT_STATS.iter().map(|s| s.to_string()).collect(),
            binary: PathBuf::from(VarnishStat::DEFAULT_BINARY),
            use_sudo: false,
            instance_name: None,
            timeout: VarnishStat::DEFAULT_TIMEOUT,
            interval: Duration::from_secs(10),
            input_format: InputFormat::default(),
            output_format: OutputFormat::default(),
            output: None,
            tags: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Loads and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(invalid("interval", "must be greater than zero"));
        }
        if self.timeout.is_zero() {
            return Err(invalid("timeout", "must be greater than zero"));
        }
        if self.binary.as_os_str().is_empty() {
            return Err(invalid("binary", "must not be empty"));
        }
        if self.tags.contains_key(SECTION_TAG) {
            return Err(invalid("tags", "the section tag is reserved"));
        }
        Ok(())
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn filter(&self) -> StatFilter {
        StatFilter::compile(&self.stats)
    }

    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            filter: self.filter(),
            input_format: self.input_format,
            tags: self.tags.clone(),
        }
    }

    pub fn stat_source(&self) -> VarnishStat {
        VarnishStat::new(&self.binary)
            .with_sudo(self.use_sudo)
            .with_instance(self.instance_name.clone())
            .with_timeout(self.timeout)
            .with_format(self.input_format)
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}
