// rust/harvest-core/src/sink/jsonl.rs

//! Sink that appends one JSON object per call to a local file.
//!
//! Each line carries the UTC time the record was written:
//!
//! ```text
//! {"timestamp":"2026-01-01T00:00:00Z","kind":"tag","name":"worker0/loss_0","value":"0.5"}
//! {"timestamp":"2026-01-01T00:00:01Z","kind":"metric","name":"steps_per_sec_0","value":12.5,"step":100}
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::SinkRecord;
use super::traits::MetricSink;
use crate::error::{HarvestError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonLine {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub record: SinkRecord,
}

pub struct JsonLinesSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Opens `path` for appending, creating it and its parent directories
    /// if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or opened.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    HarvestError::io_with_source(parent, "failed to create parent directories", e)
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| HarvestError::io_with_source(&path, "failed to open sink file", e))?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: SinkRecord) -> Result<()> {
        let line = JsonLine {
            timestamp: Utc::now(),
            record,
        };
        let name = line.record.name().to_string();
        let encoded = serde_json::to_string(&line)
            .map_err(|e| HarvestError::sink_with_source(&name, "failed to encode record", e))?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| HarvestError::sink(&name, "sink lock poisoned"))?;
        writeln!(writer, "{encoded}")
            .and_then(|_| writer.flush())
            .map_err(|e| {
                HarvestError::sink_with_source(
                    &name,
                    format!("failed to append to {}", self.path.display()),
                    e,
                )
            })
    }

    /// Reads back every record in `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is not a record.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<JsonLine>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| HarvestError::io_with_source(path, "failed to read sink file", e))?;

        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                serde_json::from_str(l).map_err(|e| {
                    HarvestError::serialization(format!("invalid record in {}: {e}", path.display()))
                })
            })
            .collect()
    }
}

impl MetricSink for JsonLinesSink {
    fn log_metric(&self, name: &str, value: f64, step: Option<u64>) -> Result<()> {
        self.append(SinkRecord::Metric {
            name: name.to_string(),
            value,
            step,
        })
    }

    fn log_tag(&self, name: &str, value: &str) -> Result<()> {
        self.append(SinkRecord::Tag {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}
