// rust/harvest-core/src/store/retry.rs

//! Retry policy for store clients.
//!
//! The harvester never retries a read itself; a backend that talks to a
//! flaky transport is wrapped in [`RetryingStore`] instead, which applies
//! exponential backoff with jitter to transient read faults.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use super::traits::MetricStore;
use crate::config::StoreConfig;
use crate::error::{HarvestError, Result};

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier (e.g., 2.0 for exponential backoff).
    pub backoff_multiplier: f64,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl From<&StoreConfig> for RetryConfig {
    fn from(store: &StoreConfig) -> Self {
        Self {
            max_retries: store.max_retries,
            initial_delay: Duration::from_millis(store.retry_delay_ms),
            max_delay: Duration::from_millis(store.max_retry_delay_ms),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates a retry configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculates the delay for a given attempt number (0-indexed).
    ///
    /// Jitter here is a fixed function of `attempt`; use
    /// [`delay_for_attempt_seeded`](Self::delay_for_attempt_seeded) to spread
    /// retries of different callers apart.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.delay_for_attempt_seeded(attempt, 0)
    }

    /// Like [`delay_for_attempt`](Self::delay_for_attempt), with the jitter
    /// drawn from `seed` mixed with the attempt number.
    pub fn delay_for_attempt_seeded(&self, attempt: u32, seed: u32) -> Duration {
        if attempt >= self.max_retries {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt as i32);

        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        let final_delay = if self.jitter {
            // Add up to 25% jitter
            let jitter_factor = 1.0 + (rand_simple(seed.wrapping_add(attempt)) * 0.25);
            delay_secs * jitter_factor
        } else {
            delay_secs
        };

        Duration::from_secs_f64(final_delay)
    }

    /// Returns true if more retries are allowed for the given attempt.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Pseudo-random value in [0, 1] derived from `seed`.
fn rand_simple(seed: u32) -> f64 {
    let x = seed.wrapping_mul(1103515245).wrapping_add(12345);
    (x as f64) / (u32::MAX as f64)
}

/// Jitter seed mixing the process id with the key.
fn jitter_seed(key: &str) -> u32 {
    let mut hasher = DefaultHasher::new();
    std::process::id().hash(&mut hasher);
    key.hash(&mut hasher);
    hasher.finish() as u32
}

/// Faults worth another attempt: anything the backend attributes to an
/// underlying I/O or transport error.
fn is_retryable(error: &HarvestError) -> bool {
    matches!(
        error,
        HarvestError::Store { source: Some(_), .. } | HarvestError::Io { .. }
    )
}

/// Wraps a store and retries transient read faults with backoff.
pub struct RetryingStore<S> {
    inner: S,
    config: RetryConfig,
}

impl<S: MetricStore> RetryingStore<S> {
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: MetricStore> MetricStore for RetryingStore<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut attempt = 0;
        let seed = jitter_seed(key);

        loop {
            match self.inner.get(key) {
                Ok(value) => return Ok(value),
                Err(e) if is_retryable(&e) && self.config.should_retry(attempt) => {
                    let delay = self.config.delay_for_attempt_seeded(attempt, seed);
                    tracing::debug!(
                        key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "store read failed, retrying: {e}"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with a transient fault a fixed number of times, then succeeds.
    struct FlakyStore {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl MetricStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(HarvestError::store_with_source(
                    key,
                    "connection reset",
                    std::io::Error::from(std::io::ErrorKind::ConnectionReset),
                ))
            } else {
                Ok(Some(b"ok".to_vec()))
            }
        }
    }

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    #[test]
    fn test_from_store_config() {
        let store = StoreConfig {
            max_retries: 7,
            retry_delay_ms: 20,
            max_retry_delay_ms: 400,
            ..Default::default()
        };

        let retry = RetryConfig::from(&store);
        assert_eq!(retry.max_retries, 7);
        assert_eq!(retry.initial_delay, Duration::from_millis(20));
        assert_eq!(retry.max_delay, Duration::from_millis(400));
    }

    #[test]
    fn test_delay_for_attempt() {
        let config = RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            backoff_multiplier: 2.0,
            jitter: false,
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        // Capped at max_delay
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(300));
        assert_eq!(config.delay_for_attempt(5), Duration::ZERO);
    }

    #[test]
    fn test_delay_with_jitter() {
        let config = RetryConfig {
            jitter: true,
            ..RetryConfig::default()
        };

        let delay = config.delay_for_attempt(0);
        assert!(delay >= Duration::from_millis(100));
        assert!(delay <= Duration::from_millis(125));
    }

    #[test]
    fn test_seeded_jitter_spreads_delays() {
        let config = RetryConfig::default();

        let first = config.delay_for_attempt_seeded(0, 1);
        let second = config.delay_for_attempt_seeded(0, 2);
        assert_ne!(first, second);
        for delay in [first, second] {
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(125));
        }

        assert_eq!(
            config.delay_for_attempt(1),
            config.delay_for_attempt_seeded(1, 0)
        );
        assert_eq!(jitter_seed("worker0/loss"), jitter_seed("worker0/loss"));
        assert_ne!(jitter_seed("worker0/loss"), jitter_seed("worker1/loss"));
    }

    #[test]
    fn test_eventual_success() {
        let store = RetryingStore::new(FlakyStore::new(2), fast_config(5));
        assert_eq!(store.get("worker0/loss").unwrap(), Some(b"ok".to_vec()));
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_exhausted() {
        let store = RetryingStore::new(FlakyStore::new(10), fast_config(2));
        assert!(store.get("worker0/loss").is_err());
        // Initial attempt + 2 retries
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_no_retry() {
        let store = RetryingStore::new(FlakyStore::new(1), RetryConfig::no_retry());
        assert!(store.get("worker0/loss").is_err());
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_permanent_fault_not_retried() {
        struct BadKeyStore(AtomicU32);
        impl MetricStore for BadKeyStore {
            fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(HarvestError::store(key, "key does not map to a relative path"))
            }
        }

        let store = RetryingStore::new(BadKeyStore(AtomicU32::new(0)), fast_config(5));
        assert!(store.get("../x").is_err());
        assert_eq!(store.inner().0.load(Ordering::SeqCst), 1);
    }
}
