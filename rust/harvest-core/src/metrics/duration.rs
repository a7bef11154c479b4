// rust/harvest-core/src/metrics/duration.rs

//! Whole-job and per-node timing, exported as flat metrics.

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::serde_secs::{option_secs, option_secs_map};
use crate::sink::{attempt_tag, format_key, MetricSink};

/// Timing collected at the end of a job attempt.
///
/// `None` means "did not happen or was not measured"; such values are
/// skipped on export and never reported as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationAggregate {
    #[serde(with = "option_secs", skip_serializing_if = "Option::is_none")]
    pub total_training_duration: Option<Duration>,
    #[serde(with = "option_secs", skip_serializing_if = "Option::is_none")]
    pub total_eval_duration: Option<Duration>,
    /// Container lifetime per node.
    #[serde(with = "option_secs_map")]
    pub container_duration: IndexMap<String, Option<Duration>>,
    /// Combined train and eval time per node.
    #[serde(with = "option_secs_map")]
    pub train_eval_time_per_node: IndexMap<String, Option<Duration>>,
}

impl DurationAggregate {
    /// Flattens the aggregate into `(tagged_name, seconds)` pairs.
    ///
    /// Scalars are named `"{field}_{n_try}"`, per-node entries
    /// `"{node}_{field}_{n_try}"`.
    pub fn to_metrics(&self, n_try: u32) -> Vec<(String, f64)> {
        let scalars = [
            ("total_training_duration", self.total_training_duration),
            ("total_eval_duration", self.total_eval_duration),
        ];
        let per_node = [
            ("container_duration", &self.container_duration),
            ("train_eval_time_per_node", &self.train_eval_time_per_node),
        ];

        let mut metrics = Vec::new();

        for (field, value) in scalars {
            if let Some(d) = value {
                metrics.push((attempt_tag(field, n_try), d.as_secs_f64()));
            }
        }

        for (field, nodes) in per_node {
            for (node, value) in nodes {
                if let Some(d) = value {
                    let name = format_key(&attempt_tag(&format!("{node}_{field}"), n_try));
                    metrics.push((name, d.as_secs_f64()));
                }
            }
        }

        metrics
    }

    /// Sends every present value to `sink`.
    ///
    /// # Errors
    ///
    /// Returns the first sink error; values after it are not sent.
    pub fn log_to<S: MetricSink + ?Sized>(&self, sink: &S, n_try: u32) -> Result<()> {
        for (name, secs) in self.to_metrics(n_try) {
            sink.log_metric(&name, secs, None)?;
        }
        Ok(())
    }
}
