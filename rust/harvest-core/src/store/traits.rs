// rust/harvest-core/src/store/traits.rs

//! Read capability over the shared key-value store.

use crate::error::Result;

/// Read access to the store the workers publish their values into.
///
/// Implementations must tolerate repeated and concurrent calls, since other
/// components of the job read and write the same store. Any timeout or retry
/// policy lives in the implementation, never in its callers.
///
/// # Object Safety
///
/// This trait is object-safe and can be used with `Arc<dyn MetricStore>`.
pub trait MetricStore: Send + Sync {
    /// Fetches the raw value stored under `key`.
    ///
    /// Returns `Ok(None)` when no value has been written yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or read.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

impl<S: MetricStore + ?Sized> MetricStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }
}
