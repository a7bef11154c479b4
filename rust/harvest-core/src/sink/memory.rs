// rust/harvest-core/src/sink/memory.rs

use std::sync::Mutex;

use super::record::SinkRecord;
use super::traits::MetricSink;
use crate::error::{HarvestError, Result};

/// Sink that keeps every record in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<SinkRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything received so far.
    pub fn records(&self) -> Vec<SinkRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    /// Returns the `(name, value)` pairs of all received tags.
    pub fn tags(&self) -> Vec<(String, String)> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                SinkRecord::Tag { name, value } => Some((name, value)),
                SinkRecord::Metric { .. } => None,
            })
            .collect()
    }

    /// Returns the `(name, value, step)` triples of all received metrics.
    pub fn metrics(&self) -> Vec<(String, f64, Option<u64>)> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                SinkRecord::Metric { name, value, step } => Some((name, value, step)),
                SinkRecord::Tag { .. } => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .map(|r| r.len())
            .unwrap_or_else(|e| e.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, record: SinkRecord) -> Result<()> {
        let name = record.name().to_string();
        self.records
            .lock()
            .map_err(|_| HarvestError::sink(name, "sink lock poisoned"))?
            .push(record);
        Ok(())
    }
}

impl MetricSink for MemorySink {
    fn log_metric(&self, name: &str, value: f64, step: Option<u64>) -> Result<()> {
        self.push(SinkRecord::Metric {
            name: name.to_string(),
            value,
            step,
        })
    }

    fn log_tag(&self, name: &str, value: &str) -> Result<()> {
        self.push(SinkRecord::Tag {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let sink = MemorySink::new();
        sink.log_tag("worker0/loss_0", "0.5").unwrap();
        sink.log_metric("steps_per_sec_0", 12.5, Some(100)).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.records()[0].name(), "worker0/loss_0");
        assert_eq!(sink.tags(), vec![("worker0/loss_0".to_string(), "0.5".to_string())]);
        assert_eq!(
            sink.metrics(),
            vec![("steps_per_sec_0".to_string(), 12.5, Some(100))]
        );
    }

    #[test]
    fn test_poisoned_lock_keeps_records() {
        let sink = std::sync::Arc::new(MemorySink::new());
        sink.log_tag("worker0/loss_0", "0.5").unwrap();

        let poisoner = sink.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.records.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(sink.records.is_poisoned());
        assert_eq!(sink.len(), 1);
        assert!(!sink.is_empty());
        assert_eq!(sink.records().len(), 1);
    }
}
