// rust/harvest-core/src/serde_secs.rs

//! Serde helpers storing durations as fractional seconds.

use std::time::Duration;

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serializer};

fn from_secs<E: serde::de::Error>(secs: f64) -> Result<Duration, E> {
    Duration::try_from_secs_f64(secs).map_err(|e| E::custom(format!("invalid duration {secs}: {e}")))
}

pub mod option_secs {
    use super::*;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<f64>::deserialize(deserializer)?
            .map(from_secs::<D::Error>)
            .transpose()
    }
}

/// Absent entries are left out when serializing.
pub mod option_secs_map {
    use super::*;

    pub fn serialize<S>(
        value: &IndexMap<String, Option<Duration>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let present: Vec<_> = value
            .iter()
            .filter_map(|(node, d)| d.map(|d| (node, d.as_secs_f64())))
            .collect();

        let mut map = serializer.serialize_map(Some(present.len()))?;
        for (node, secs) in present {
            map.serialize_entry(node, &secs)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<IndexMap<String, Option<Duration>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        IndexMap::<String, Option<f64>>::deserialize(deserializer)?
            .into_iter()
            .map(|(node, secs)| {
                let d = secs.map(from_secs::<D::Error>).transpose()?;
                Ok((node, d))
            })
            .collect()
    }
}
