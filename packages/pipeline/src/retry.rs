//! Shared retry policy for external calls.
//!
//! The generator and the publisher share one policy instead of each carrying
//! its own backoff constants. This covers transport-level retries within a
//! single job attempt; the job-level retry budget (`retry_count`) is owned
//! by the job store's release path.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Errors that can report whether retrying might help.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Exponential backoff policy: `base_delay * 2^attempt`, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries. Useful in tests and for callers that
    /// manage retries at a higher level.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before the retry following failed attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.min(31);
        let delay = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(exp));
        delay.min(self.max_delay)
    }

    /// Run `op`, retrying on retryable errors until the attempt budget is
    /// exhausted. The last error is returned unchanged.
    pub async fn run<T, E, Fut, F>(&self, mut op: F) -> std::result::Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
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

    #[derive(Debug)]
    struct TestError {
        retryable: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (retryable: {})", self.retryable)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };

        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(350));
        assert_eq!(policy.backoff(10), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        };
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<u32, TestError> = policy
            .run(move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(TestError { retryable: true })
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_retryable_errors() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), TestError> = policy
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError { retryable: false })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stops_after_attempt_budget() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        };
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), TestError> = policy
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError { retryable: true })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
