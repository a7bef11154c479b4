// rust/harvest-core/src/sink/log.rs

use super::traits::MetricSink;
use crate::error::Result;

/// Sink that only reports through `tracing`, for dry runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MetricSink for LogSink {
    fn log_metric(&self, name: &str, value: f64, step: Option<u64>) -> Result<()> {
        tracing::info!(target: "harvest::sink", name, value, step = ?step, "metric");
        Ok(())
    }

    fn log_tag(&self, name: &str, value: &str) -> Result<()> {
        tracing::info!(target: "harvest::sink", name, value, "tag");
        Ok(())
    }
}
