// rust/harvest-core/src/store/memory.rs

use std::collections::HashMap;
use std::sync::RwLock;

use super::traits::MetricStore;
use crate::error::{HarvestError, Result};

/// In-process store, used when producers and the collector share a process
/// and as a test double.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `value` under `key`, replacing any previous value.
    pub fn put(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<Vec<u8>> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values
            .read()
            .map(|v| v.len())
            .unwrap_or_else(|e| e.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetricStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let values = self
            .values
            .read()
            .map_err(|_| HarvestError::store(key, "store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }
}
