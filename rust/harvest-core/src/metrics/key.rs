// rust/harvest-core/src/metrics/key.rs

//! Expected metric keys and the set of keys still waiting to be harvested.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexSet;

/// One expected value of one job attempt, rendered `"{task}/{key}"`.
///
/// Slashes inside either part are not escaped, so `("a/b", "c")` and
/// `("a", "b/c")` render to the same key.
#[derive(Debug, Clone)]
pub struct MetricKey {
    rendered: String,
    split: usize,
}

impl MetricKey {
    pub fn new(task: &str, key: &str) -> Self {
        Self {
            rendered: format!("{task}/{key}"),
            split: task.len(),
        }
    }

    pub fn task(&self) -> &str {
        &self.rendered[..self.split]
    }

    pub fn key(&self) -> &str {
        &self.rendered[self.split + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl PartialEq for MetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.rendered == other.rendered
    }
}

impl Eq for MetricKey {}

// Hash and Eq follow the rendered string so lookups by `&str` work.
impl Hash for MetricKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rendered.hash(state);
    }
}

impl Borrow<str> for MetricKey {
    fn borrow(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// Keys not harvested yet, in schedule order.
///
/// The set is filled once and afterwards only shrinks; there is no way to
/// add a key back once it has been removed.
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    keys: IndexSet<MetricKey>,
}

impl PendingSet {
    /// Builds the set from `task → [key, ...]` pairs, keeping task order and
    /// then key order. Duplicates keep their first position.
    pub fn from_schedule<T, I, K>(schedule: impl IntoIterator<Item = (T, I)>) -> Self
    where
        T: AsRef<str>,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut keys = IndexSet::new();
        for (task, task_keys) in schedule {
            for key in task_keys {
                keys.insert(MetricKey::new(task.as_ref(), key.as_ref()));
            }
        }
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricKey> {
        self.keys.iter()
    }

    /// Rendered keys, in polling order.
    pub fn to_vec(&self) -> Vec<String> {
        self.keys.iter().map(|k| k.to_string()).collect()
    }

    /// Keeps the keys for which `f` returns true, preserving order.
    pub(crate) fn retain(&mut self, f: impl FnMut(&MetricKey) -> bool) {
        self.keys.retain(f);
    }
}
