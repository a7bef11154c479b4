// rust/harvest-core/src/metrics/harvester.rs

//! One-shot harvesting of values published by remote workers.
//!
//! Workers write their results into the shared store whenever they finish,
//! if they finish at all. The harvester knows which keys to expect and
//! polls for them: every [`OneShotHarvester::drain_once`] call makes one
//! pass over the keys still pending, forwards the ones that showed up and
//! drops them from the pending set for good.
//!
//! A key that never shows up stays pending until the caller stops calling
//! `drain_once`. That is the expected outcome for a worker that crashed or
//! skipped a phase, not an error.

use crate::config::KeySchedule;
use crate::error::{HarvestError, Result};
use crate::sink::{attempt_tag, format_key, MetricSink};
use crate::store::MetricStore;

use super::key::{MetricKey, PendingSet};

/// What happened to the keys polled by one [`OneShotHarvester::drain_once`]
/// pass.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Number of keys queried.
    pub polled: usize,
    /// Keys forwarded to the sink, with their decoded values.
    pub harvested: Vec<(String, String)>,
    /// Keys dropped because their value is not text.
    pub undecodable: Vec<String>,
    /// Keys left pending because the store or sink failed.
    pub faults: Vec<(String, HarvestError)>,
    /// Keys still pending after the pass.
    pub remaining: usize,
}

impl DrainReport {
    /// Keys resolved by this pass, forwarded or dropped.
    pub fn resolved(&self) -> usize {
        self.harvested.len() + self.undecodable.len()
    }

    /// Turns transport faults into an error for callers that want them
    /// propagated.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Drain`] if any key hit a store or sink fault.
    pub fn into_result(self) -> Result<Self> {
        match self.faults.first() {
            None => Ok(self),
            Some((key, err)) => Err(HarvestError::drain(
                self.faults.len(),
                format!("{key}: {err}"),
            )),
        }
    }
}

enum Outcome {
    Absent,
    Harvested(String),
    Undecodable,
    Fault(HarvestError),
}

/// Polls a store for a fixed set of expected keys and forwards each value
/// to a sink at most once.
///
/// Tags sent to the sink are `"{task}/{key}_{n_try}"`, so instances for
/// different attempts of the same job never collide even when they read
/// the same store.
pub struct OneShotHarvester<S, K> {
    store: S,
    sink: K,
    pending: PendingSet,
    n_try: u32,
}

impl<S: MetricStore, K: MetricSink> OneShotHarvester<S, K> {
    /// Creates a harvester expecting every key of `schedule`. A missing
    /// schedule means nothing is expected.
    pub fn new(store: S, sink: K, schedule: Option<&KeySchedule>, n_try: u32) -> Self {
        let pending = PendingSet::from_schedule(schedule.into_iter().flatten());
        Self::with_pending(store, sink, pending, n_try)
    }

    pub fn with_pending(store: S, sink: K, pending: PendingSet, n_try: u32) -> Self {
        tracing::debug!(keys = pending.len(), n_try, "harvester created");
        Self {
            store,
            sink,
            pending,
            n_try,
        }
    }

    pub fn n_try(&self) -> u32 {
        self.n_try
    }

    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }

    /// True once every expected key has been resolved.
    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Polls every pending key once.
    ///
    /// Absent keys stay pending. Present keys are forwarded and removed.
    /// A value that is not UTF-8 is logged and removed without being
    /// forwarded, since asking again would return the same bytes. A store or
    /// sink failure leaves the key pending and is recorded in the report;
    /// the pass always continues with the next key.
    pub fn drain_once(&mut self) -> DrainReport {
        let mut report = DrainReport {
            polled: self.pending.len(),
            ..Default::default()
        };

        let store = &self.store;
        let sink = &self.sink;
        let n_try = self.n_try;

        self.pending.retain(|key| match poll_key(store, sink, n_try, key) {
            Outcome::Absent => true,
            Outcome::Harvested(value) => {
                report.harvested.push((key.to_string(), value));
                false
            }
            Outcome::Undecodable => {
                report.undecodable.push(key.to_string());
                false
            }
            Outcome::Fault(err) => {
                report.faults.push((key.to_string(), err));
                true
            }
        });

        report.remaining = self.pending.len();
        tracing::debug!(
            polled = report.polled,
            harvested = report.harvested.len(),
            undecodable = report.undecodable.len(),
            faults = report.faults.len(),
            remaining = report.remaining,
            "drain pass finished"
        );
        report
    }
}

fn poll_key<S, K>(store: &S, sink: &K, n_try: u32, key: &MetricKey) -> Outcome
where
    S: MetricStore + ?Sized,
    K: MetricSink + ?Sized,
{
    let raw = match store.get(key.as_str()) {
        // An empty value counts as not written yet.
        Ok(Some(raw)) if !raw.is_empty() => raw,
        Ok(_) => return Outcome::Absent,
        Err(err) => {
            tracing::error!(key = %key, "failed to read key from store: {err}");
            return Outcome::Fault(err);
        }
    };

    let value = match String::from_utf8(raw) {
        Ok(value) => value,
        Err(e) => {
            let raw = String::from_utf8_lossy(e.as_bytes()).into_owned();
            let err = HarvestError::decode(key.as_str(), e);
            tracing::warn!(key = %key, raw = %raw, "dropping key with undecodable value: {err}");
            return Outcome::Undecodable;
        }
    };

    let tag = attempt_tag(&format_key(key.as_str()), n_try);
    if let Err(err) = sink.log_tag(&tag, &value) {
        tracing::error!(key = %key, tag = %tag, "failed to forward value to sink: {err}");
        return Outcome::Fault(err);
    }

    tracing::info!(key = %key, tag = %tag, value = %value, "harvested");
    Outcome::Harvested(value)
}
