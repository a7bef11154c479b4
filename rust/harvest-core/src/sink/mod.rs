// rust/harvest-core/src/sink/mod.rs

//! Export side: where harvested values and derived metrics end up.
//!
//! Everything that reaches a sink is tagged with the attempt number of the
//! running job, so a retried job never overwrites or merges with the values
//! of an earlier attempt. Names pass through [`format_key`] first.

mod jsonl;
mod log;
mod memory;
mod record;
mod traits;

pub use jsonl::{JsonLine, JsonLinesSink};
pub use log::LogSink;
pub use memory::MemorySink;
pub use record::SinkRecord;
pub use traits::MetricSink;

/// Replaces characters tracking servers reject in metric and tag names.
///
/// ASCII letters and digits, `_`, `-`, `.`, ` ` and `/` are kept; anything
/// else becomes `_`.
pub fn format_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' | '.' | ' ' | '/' => c,
            _ => '_',
        })
        .collect()
}

/// Appends the attempt suffix: `"{name}_{n_try}"`.
pub fn attempt_tag(name: &str, n_try: u32) -> String {
    format!("{name}_{n_try}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_key_keeps_allowed() {
        assert_eq!(format_key("worker0/loss"), "worker0/loss");
        assert_eq!(format_key("eval-1.auc score"), "eval-1.auc score");
    }

    #[test]
    fn test_format_key_replaces_rest() {
        assert_eq!(format_key("host:8080"), "host_8080");
        assert_eq!(format_key("worker[0]"), "worker_0_");
        assert_eq!(format_key("é"), "_");
    }

    #[test]
    fn test_attempt_tag() {
        assert_eq!(attempt_tag("worker0/loss", 0), "worker0/loss_0");
        assert_eq!(attempt_tag("steps_per_sec", 12), "steps_per_sec_12");
    }
}
