// rust/harvest-core/src/config.rs

//! Configuration management for the metric collector.
//!
//! This module provides configuration parsing from TOML files, environment
//! variable overrides, and validation of configuration values.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{HarvestError, Result};

/// Expected metric keys per task, in the order they should be polled.
pub type KeySchedule = IndexMap<String, Vec<String>>;

// Top-level collector configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub store: StoreConfig,
    pub sink: SinkConfig,
    pub harvest: HarvestSettings,
    pub throughput: ThroughputConfig,
    /// Table of `task = ["key", ...]` entries.
    pub schedule: KeySchedule,
}

// Shared store client options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    // Directory the workers write their values under.
    pub base_path: PathBuf,
    /// Maximum number of retries for a failed read.
    pub max_retries: u32,
    /// Initial delay (milliseconds) between retries.
    pub retry_delay_ms: u64,
    /// Maximum delay (milliseconds) between retries.
    pub max_retry_delay_ms: u64,
}

/// Sink backend type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Append JSON records to a file.
    #[default]
    Jsonl,
    /// Emit records through `tracing` only.
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    // Output file for the jsonl sink.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestSettings {
    /// Attempt number of the running job.
    pub n_try: u32,
    /// Delay between two drain passes.
    pub poll_interval_ms: u64,
    /// Give up on pending keys after this many seconds (0 waits forever).
    pub timeout_secs: u64,
}

/// Reporting cadence of the throughput reporter.
///
/// At most one of the two fields may be set. When neither is set the
/// reporter fires every [`DEFAULT_EVERY_N_STEPS`] steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThroughputConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub every_n_steps: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub every_n_secs: Option<f64>,
}

pub const DEFAULT_EVERY_N_STEPS: u64 = 100;

/// Resolved trigger policy for the throughput reporter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cadence {
    Steps(u64),
    Interval(Duration),
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./kv"),
            max_retries: 3,
            retry_delay_ms: 100,
            max_retry_delay_ms: 5_000,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Jsonl,
            path: PathBuf::from("./metrics.jsonl"),
        }
    }
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            n_try: 0,
            poll_interval_ms: 1_000,
            timeout_secs: 0,
        }
    }
}

impl HarvestSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl ThroughputConfig {
    pub fn every_n_steps(n: u64) -> Self {
        Self {
            every_n_steps: Some(n),
            every_n_secs: None,
        }
    }

    pub fn every_n_secs(secs: f64) -> Self {
        Self {
            every_n_steps: None,
            every_n_secs: Some(secs),
        }
    }

    /// Resolves the configured cadence.
    ///
    /// # Errors
    ///
    /// Returns an error if both cadences are set or the value is not positive.
    pub fn cadence(&self) -> Result<Cadence> {
        match (self.every_n_steps, self.every_n_secs) {
            (Some(_), Some(_)) => Err(HarvestError::config(
                "throughput: exactly one of every_n_steps and every_n_secs may be set",
            )),
            (Some(0), None) => Err(HarvestError::config(
                "throughput.every_n_steps must be greater than 0",
            )),
            (Some(n), None) => Ok(Cadence::Steps(n)),
            (None, Some(secs)) if !(secs.is_finite() && secs > 0.0) => Err(HarvestError::config(
                "throughput.every_n_secs must be a positive number",
            )),
            (None, Some(secs)) => Duration::try_from_secs_f64(secs)
                .map(Cadence::Interval)
                .map_err(|e| {
                    HarvestError::config_with_source("throughput.every_n_secs is out of range", e)
                }),
            (None, None) => Ok(Cadence::Steps(DEFAULT_EVERY_N_STEPS)),
        }
    }
}

/// A schedule name must be one plain path segment: `"{task}/{key}"` has to
/// stay unambiguous and map onto a file below the store's base path.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    !name.contains('/')
        && matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
}

impl FromStr for HarvestConfig {
    type Err = HarvestError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| HarvestError::config_with_source("failed to parse TOML config", e))
    }
}

impl HarvestConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| HarvestError::io_with_source(path, "failed to read config file", e))?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // Variables are prefixed with `MH_` and name the section then the field:
    // - `MH_STORE_BASE_PATH` overrides `store.base_path`
    // - `MH_SINK_KIND` overrides `sink.kind` ("jsonl" or "log")
    // - `MH_HARVEST_N_TRY` overrides `harvest.n_try`
    // - `MH_THROUGHPUT_EVERY_N_SECS` overrides `throughput.every_n_secs`
    //
    // Setting one throughput cadence through the environment clears the other.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        // Store overrides
        if let Ok(val) = std::env::var("MH_STORE_BASE_PATH") {
            self.store.base_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("MH_STORE_MAX_RETRIES") {
            if let Ok(v) = val.parse() {
                self.store.max_retries = v;
            }
        }
        if let Ok(val) = std::env::var("MH_STORE_RETRY_DELAY_MS") {
            if let Ok(v) = val.parse() {
                self.store.retry_delay_ms = v;
            }
        }
        if let Ok(val) = std::env::var("MH_STORE_MAX_RETRY_DELAY_MS") {
            if let Ok(v) = val.parse() {
                self.store.max_retry_delay_ms = v;
            }
        }

        // Sink overrides
        if let Ok(val) = std::env::var("MH_SINK_KIND") {
            match val.to_lowercase().as_str() {
                "jsonl" => self.sink.kind = SinkKind::Jsonl,
                "log" => self.sink.kind = SinkKind::Log,
                _ => {} // ignore invalid values
            }
        }
        if let Ok(val) = std::env::var("MH_SINK_PATH") {
            self.sink.path = PathBuf::from(val);
        }

        // Harvest overrides
        if let Ok(val) = std::env::var("MH_HARVEST_N_TRY") {
            if let Ok(v) = val.parse() {
                self.harvest.n_try = v;
            }
        }
        if let Ok(val) = std::env::var("MH_HARVEST_POLL_INTERVAL_MS") {
            if let Ok(v) = val.parse() {
                self.harvest.poll_interval_ms = v;
            }
        }
        if let Ok(val) = std::env::var("MH_HARVEST_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                self.harvest.timeout_secs = v;
            }
        }

        // Throughput overrides
        if let Ok(val) = std::env::var("MH_THROUGHPUT_EVERY_N_STEPS") {
            if let Ok(v) = val.parse() {
                self.throughput = ThroughputConfig::every_n_steps(v);
            }
        }
        if let Ok(val) = std::env::var("MH_THROUGHPUT_EVERY_N_SECS") {
            if let Ok(v) = val.parse() {
                self.throughput = ThroughputConfig::every_n_secs(v);
            }
        }

        self
    }

    // Validate all configuration values.
    //
    // # Errors
    //
    // Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.store.base_path.as_os_str().is_empty() {
            return Err(HarvestError::config("store.base_path must not be empty"));
        }
        if self.store.max_retry_delay_ms < self.store.retry_delay_ms {
            return Err(HarvestError::config(
                "store.max_retry_delay_ms must not be less than store.retry_delay_ms",
            ));
        }

        if self.sink.kind == SinkKind::Jsonl && self.sink.path.as_os_str().is_empty() {
            return Err(HarvestError::config(
                "sink.path is required when sink.kind is 'jsonl'",
            ));
        }

        if self.harvest.poll_interval_ms == 0 {
            return Err(HarvestError::config(
                "harvest.poll_interval_ms must be greater than 0",
            ));
        }

        self.throughput.cadence()?;

        for (task, keys) in &self.schedule {
            if !is_plain_name(task) {
                return Err(HarvestError::config(format!(
                    "schedule: invalid task name '{task}'"
                )));
            }
            if let Some(key) = keys.iter().find(|k| !is_plain_name(k)) {
                return Err(HarvestError::config(format!(
                    "schedule.{task}: invalid key name '{key}'"
                )));
            }
        }

        Ok(())
    }
}
