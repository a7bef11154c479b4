// rust/harvest-core/src/store/mod.rs

//! Client side of the shared key-value store.
//!
//! Workers publish their values into a store the collector can only read.
//! The harvester sees the store through the [`MetricStore`] capability, so
//! backends can be swapped without touching harvesting logic.
//!
//! # Example
//!
//! ```no_run
//! use harvest_core::store::{DirectoryStore, MetricStore};
//!
//! let store = DirectoryStore::open("/shared/kv").unwrap();
//!
//! // Producer side
//! store.put("worker0/loss", b"0.25").unwrap();
//!
//! // Collector side
//! assert_eq!(store.get("worker0/loss").unwrap(), Some(b"0.25".to_vec()));
//! ```

mod directory;
mod memory;
mod retry;
mod traits;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;
pub use retry::{RetryConfig, RetryingStore};
pub use traits::MetricStore;
