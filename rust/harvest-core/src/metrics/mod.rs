// rust/harvest-core/src/metrics/mod.rs

//! Metric collection for a distributed job.
//!
//! - [`OneShotHarvester`] polls the shared store for values the workers
//!   publish and forwards each one exactly once.
//! - [`ThroughputReporter`] emits the training rate from the chief.
//! - [`DurationAggregate`] exports whole-job and per-node timings.
//!
//! Every name sent to a sink ends with the attempt number of the job.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use harvest_core::config::KeySchedule;
//! use harvest_core::metrics::OneShotHarvester;
//! use harvest_core::sink::MemorySink;
//! use harvest_core::store::MemoryStore;
//!
//! let mut schedule = KeySchedule::new();
//! schedule.insert("worker0".to_string(), vec!["loss".to_string()]);
//! schedule.insert("worker1".to_string(), vec!["loss".to_string()]);
//!
//! let store = Arc::new(MemoryStore::new());
//! let sink = Arc::new(MemorySink::new());
//! let mut harvester = OneShotHarvester::new(store.clone(), sink.clone(), Some(&schedule), 0);
//!
//! store.put("worker0/loss", "0.5");
//! harvester.drain_once();
//!
//! assert_eq!(sink.tags(), vec![("worker0/loss_0".to_string(), "0.5".to_string())]);
//! assert_eq!(harvester.pending().to_vec(), vec!["worker1/loss"]);
//! ```

mod duration;
mod harvester;
mod key;
mod throughput;
mod timer;

pub use duration::DurationAggregate;
pub use harvester::{DrainReport, OneShotHarvester};
pub use key::{MetricKey, PendingSet};
pub use throughput::{ThroughputReporter, STEPS_PER_SEC};
pub use timer::StepTimer;
