// rust/harvest-core/src/sink/traits.rs

//! Write capability over the experiment-tracking sink.

use crate::error::Result;

/// Destination for exported metrics and annotations.
///
/// Both operations are fire-and-forget from the caller's point of view, but
/// failures are returned rather than swallowed so the driver can decide what
/// to do with them.
///
/// # Object Safety
///
/// This trait is object-safe and can be used with `Arc<dyn MetricSink>`.
pub trait MetricSink: Send + Sync {
    /// Records a scalar value, optionally at a training step.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot accept the value.
    fn log_metric(&self, name: &str, value: f64, step: Option<u64>) -> Result<()>;

    /// Records a string annotation.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot accept the value.
    fn log_tag(&self, name: &str, value: &str) -> Result<()>;
}

impl<S: MetricSink + ?Sized> MetricSink for std::sync::Arc<S> {
    fn log_metric(&self, name: &str, value: f64, step: Option<u64>) -> Result<()> {
        (**self).log_metric(name, value, step)
    }

    fn log_tag(&self, name: &str, value: &str) -> Result<()> {
        (**self).log_tag(name, value)
    }
}
