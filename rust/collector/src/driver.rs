//! Drain loop driving a harvester until it is done, times out or is stopped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use harvest_core::config::{SinkConfig, SinkKind, StoreConfig};
use harvest_core::store::{DirectoryStore, RetryConfig, RetryingStore};
use harvest_core::{JsonLinesSink, LogSink, MetricSink, MetricStore, OneShotHarvester, Result};
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every expected key was resolved.
    Complete,
    /// The timeout elapsed with keys still pending.
    TimedOut,
    /// The shutdown signal fired.
    Interrupted,
}

#[derive(Debug)]
pub struct HarvestSummary {
    pub reason: StopReason,
    pub passes: u64,
    pub harvested: usize,
    pub undecodable: usize,
    pub faults: usize,
    /// Keys never harvested, in schedule order.
    pub pending: Vec<String>,
}

pub fn open_store(config: &StoreConfig) -> Result<RetryingStore<DirectoryStore>> {
    let store = DirectoryStore::new(config)?;
    Ok(RetryingStore::new(store, RetryConfig::from(config)))
}

pub fn open_sink(config: &SinkConfig) -> Result<Arc<dyn MetricSink>> {
    let sink: Arc<dyn MetricSink> = match config.kind {
        SinkKind::Jsonl => Arc::new(JsonLinesSink::open(&config.path)?),
        SinkKind::Log => Arc::new(LogSink),
    };
    Ok(sink)
}

/// Calls `drain_once` every `poll_interval` until no key is pending, the
/// timeout elapses or `shutdown` resolves. Keys still pending at that point
/// are reported and left alone.
pub async fn run<S, K>(
    harvester: &mut OneShotHarvester<S, K>,
    poll_interval: Duration,
    timeout: Option<Duration>,
    shutdown: impl Future<Output = ()>,
) -> HarvestSummary
where
    S: MetricStore,
    K: MetricSink,
{
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut summary = HarvestSummary {
        reason: StopReason::Complete,
        passes: 0,
        harvested: 0,
        undecodable: 0,
        faults: 0,
        pending: Vec::new(),
    };

    summary.reason = loop {
        if harvester.is_done() {
            break StopReason::Complete;
        }

        tokio::select! {
            biased;
            _ = &mut shutdown => break StopReason::Interrupted,
            _ = interval.tick() => {}
        }

        // Store reads may block on a slow backend.
        let report = tokio::task::block_in_place(|| harvester.drain_once());
        summary.passes += 1;
        summary.harvested += report.harvested.len();
        summary.undecodable += report.undecodable.len();
        summary.faults += report.faults.len();

        if report.resolved() > 0 {
            tracing::info!(
                resolved = report.resolved(),
                remaining = report.remaining,
                "drain pass {}",
                summary.passes
            );
        }

        if harvester.is_done() {
            break StopReason::Complete;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break StopReason::TimedOut;
        }
    };

    summary.pending = harvester.pending().to_vec();
    match summary.reason {
        StopReason::Complete => {
            tracing::info!(passes = summary.passes, "all expected keys harvested");
        }
        reason => {
            tracing::info!(
                ?reason,
                passes = summary.passes,
                "stopping with {} key(s) never written: {:?}",
                summary.pending.len(),
                summary.pending
            );
        }
    }

    summary
}
