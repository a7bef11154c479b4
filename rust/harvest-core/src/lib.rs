// rust/harvest-core/src/lib.rs

//! Distributed Metric Harvesting - Core Library
//!
//! This crate collects metrics from the workers of a distributed training
//! job. Workers publish values into a shared key-value store on their own
//! schedule; a single collector polls for the values it expects and forwards
//! them, tagged with the job's attempt number, to an experiment-tracking sink.

pub mod cluster;
pub mod config;
pub mod error;
pub mod metrics;
mod serde_secs;
pub mod sink;
pub mod store;

// Re-export commonly used types for convenience
pub use cluster::{ClusterContext, TaskSpec};
pub use config::{Cadence, HarvestConfig, KeySchedule};
pub use error::{HarvestError, Result};
pub use metrics::{DrainReport, DurationAggregate, OneShotHarvester, PendingSet, ThroughputReporter};
pub use sink::{JsonLinesSink, LogSink, MemorySink, MetricSink};
pub use store::{DirectoryStore, MemoryStore, MetricStore, RetryingStore};
