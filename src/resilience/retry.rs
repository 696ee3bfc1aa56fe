//! Timeout and retry wrappers.

use std::future::Future;
use std::time::Duration;

use crate::types::config::DispatchConfig;
use crate::{ConcordError, ConcordResult};

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base_delay * 2^attempt`.
    Exponential,
    /// Always `base_delay`.
    Constant,
}

/// Retry settings.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,

    pub base_delay: Duration,

    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Creates a new retry policy.
    pub fn new(max_retries: u32, base_delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_retries,
            base_delay,
            backoff,
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Backoff::Constant)
    }

    /// Creates a retry policy from configuration.
    pub fn from_config(config: &DispatchConfig) -> Self {
        let backoff = if config.exponential {
            Backoff::Exponential
        } else {
            Backoff::Constant
        };
        Self::new(config.max_retries, config.base_delay(), backoff)
    }

    /// Delay before the retry that follows failed attempt number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Exponential => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(attempt)),
            Backoff::Constant => self.base_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

/// Runs `operation` until it succeeds or the policy is exhausted.
///
/// The last error is returned once every attempt has failed.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> ConcordResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ConcordResult<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "Retry {}/{} after {:?}: {}",
                    attempt + 1,
                    policy.max_retries,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Bounds `future` by `timeout`, reporting expiry as a [`ConcordError::WorkerTimeout`].
pub async fn with_timeout<T, Fut>(future: Fut, timeout: Duration, worker: &str) -> ConcordResult<T>
where
    Fut: Future<Output = ConcordResult<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ConcordError::WorkerTimeout {
            worker: worker.to_string(),
            timeout,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1), Backoff::Exponential)
    }

    #[test]
    fn test_delay_for() {
        let exp = RetryPolicy::new(3, Duration::from_millis(100), Backoff::Exponential);
        assert_eq!(exp.delay_for(0), Duration::from_millis(100));
        assert_eq!(exp.delay_for(1), Duration::from_millis(200));
        assert_eq!(exp.delay_for(2), Duration::from_millis(400));

        let constant = RetryPolicy::new(3, Duration::from_millis(100), Backoff::Constant);
        assert_eq!(constant.delay_for(2), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_policy(2), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ConcordError::other("flaky"))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_last_error() {
        let calls = AtomicU32::new(0);

        let result: ConcordResult<()> = with_retry(&fast_policy(2), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Err(ConcordError::other(format!("failure {}", n)))
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err().to_string(), "failure 2");
    }

    #[tokio::test]
    async fn test_no_retry_policy_runs_once() {
        let calls = AtomicU32::new(0);

        let result: ConcordResult<()> = with_retry(&RetryPolicy::none(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ConcordError::other("nope"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result: ConcordResult<()> = with_timeout(
            async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            },
            Duration::from_millis(10),
            "slow-model",
        )
        .await;

        match result {
            Err(ConcordError::WorkerTimeout { worker, .. }) => assert_eq!(worker, "slow-model"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let result = with_timeout(async { Ok(7) }, Duration::from_secs(1), "m").await;
        assert_eq!(result.unwrap(), 7);
    }
}
