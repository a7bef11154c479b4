// rust/harvest-core/src/metrics/throughput.rs

//! Training throughput, reported by the chief only.
//!
//! Every node of the job runs the same training loop, but the rate is a
//! job-level metric: only the chief emits it, everyone else does nothing.
//! The metric name carries the attempt number, `steps_per_sec_{n_try}`, and
//! the global step is passed along as the ordering coordinate.

use std::time::{Duration, Instant};

use crate::cluster::ClusterContext;
use crate::config::Cadence;
use crate::error::Result;
use crate::sink::{attempt_tag, MetricSink};

use super::timer::StepTimer;

pub const STEPS_PER_SEC: &str = "steps_per_sec";

pub struct ThroughputReporter<K> {
    sink: K,
    is_chief: bool,
    n_try: u32,
    timer: StepTimer,
}

impl<K: MetricSink> ThroughputReporter<K> {
    pub fn new(sink: K, cluster: &ClusterContext, cadence: Cadence) -> Self {
        Self::with_role(sink, cluster.is_chief(), cluster.n_try, cadence)
    }

    pub fn with_role(sink: K, is_chief: bool, n_try: u32, cadence: Cadence) -> Self {
        Self {
            sink,
            is_chief,
            n_try,
            timer: StepTimer::new(cadence),
        }
    }

    pub fn metric_name(&self) -> String {
        attempt_tag(STEPS_PER_SEC, self.n_try)
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Call at the start of a training session.
    pub fn begin(&mut self) {
        self.timer.reset();
    }

    /// Call after every training step with the current global step.
    ///
    /// Returns the emitted rate when this call triggered a report.
    ///
    /// # Errors
    ///
    /// Returns the sink error if the report could not be written.
    pub fn after_step(&mut self, global_step: u64, now: Instant) -> Result<Option<f64>> {
        if !self.is_chief || !self.timer.should_trigger_for_step(global_step, now) {
            return Ok(None);
        }

        match self.timer.update_last_triggered_step(global_step, now) {
            Some((elapsed_steps, elapsed_time)) if !elapsed_time.is_zero() => {
                self.log_and_record(elapsed_steps, elapsed_time, global_step)
            }
            _ => Ok(None),
        }
    }

    /// Emits `elapsed_steps / elapsed_time` at `global_step`.
    ///
    /// `elapsed_time` must not be zero. Does nothing on non-chief nodes.
    ///
    /// # Errors
    ///
    /// Returns the sink error if the report could not be written.
    pub fn log_and_record(
        &self,
        elapsed_steps: u64,
        elapsed_time: Duration,
        global_step: u64,
    ) -> Result<Option<f64>> {
        if !self.is_chief {
            return Ok(None);
        }

        let steps_per_sec = elapsed_steps as f64 / elapsed_time.as_secs_f64();
        self.sink
            .log_metric(&self.metric_name(), steps_per_sec, Some(global_step))?;
        tracing::debug!(global_step, steps_per_sec, "throughput reported");
        Ok(Some(steps_per_sec))
    }
}
