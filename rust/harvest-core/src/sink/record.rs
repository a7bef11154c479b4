// rust/harvest-core/src/sink/record.rs

use serde::{Deserialize, Serialize};

/// One call received by a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SinkRecord {
    Metric {
        name: String,
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<u64>,
    },
    Tag {
        name: String,
        value: String,
    },
}

impl SinkRecord {
    pub fn name(&self) -> &str {
        match self {
            Self::Metric { name, .. } | Self::Tag { name, .. } => name,
        }
    }
}
