//! Jittered exponential backoff for rate-limited model requests.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::errors::ModelCallError;
use crate::domain::models::RetryConfig;

/// Spread applied around each computed delay.
const RANDOMIZATION_FACTOR: f64 = 0.5;

/// Retries an operation while it reports [`ModelCallError::RateLimited`].
///
/// Every other error is returned immediately. Delays double from
/// `initial_backoff_ms` up to `max_backoff_ms`, each randomized by ±50%.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_multiplier(2.0)
            .with_randomization_factor(RANDOMIZATION_FACTOR)
            .with_max_elapsed_time(None)
            .build()
    }

    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, ModelCallError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ModelCallError>>,
    {
        let mut schedule = self.schedule();
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "request succeeded after rate limiting");
                    }
                    return Ok(result);
                }
                Err(err) if err.is_rate_limited() && attempt < self.max_retries => {
                    let delay = schedule.next_backoff().unwrap_or(self.max_backoff);
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "rate limited, backing off"
                    );
                    sleep(delay).await;
                }
                Err(err) => {
                    if err.is_rate_limited() {
                        warn!(attempts = attempt + 1, "rate limit retries exhausted");
                    }
                    return Err(err);
                }
            }
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, 1, 5)
    }

    #[tokio::test]
    async fn test_retries_rate_limit_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = fast_policy(3)
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ModelCallError::RateLimited)
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_other_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = fast_policy(3)
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ModelCallError::Timeout)
                }
            })
            .await;

        assert!(matches!(result, Err(ModelCallError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = fast_policy(2)
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ModelCallError::RateLimited)
                }
            })
            .await;

        assert!(matches!(result, Err(ModelCallError::RateLimited)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
