/// Retry policy with exponential backoff and jitter
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first call
    pub max_retries: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add random jitter to backoff (±30%)
    pub jitter: bool,
    /// Upper bound for a single attempt; `None` lets an attempt run unbounded
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
            attempt_timeout: None,
        }
    }
}

impl RetryConfig {
    /// Un-jittered delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let millis = self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: E },
    #[error("gave up after {attempts} attempts: last attempt timed out after {after:?}")]
    TimedOut { attempts: u32, after: Duration },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::TimedOut { attempts, .. } => {
                *attempts
            }
        }
    }
}

enum AttemptFailure<E> {
    Failed(E),
    TimedOut(Duration),
}

/// Execute a future with retry logic.
///
/// `operation` only labels the warning emitted before each retry.
pub async fn with_retry<F, Fut, T, E>(
    operation: &str,
    config: &RetryConfig,
    mut f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let failure = match config.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, f()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => AttemptFailure::Failed(e),
                Err(_) => AttemptFailure::TimedOut(limit),
            },
            None => match f().await {
                Ok(value) => return Ok(value),
                Err(e) => AttemptFailure::Failed(e),
            },
        };

        if attempt > config.max_retries {
            warn!(operation, attempts = attempt, "Max retries ({}) reached", config.max_retries);
            return Err(match failure {
                AttemptFailure::Failed(last_error) => RetryError::Exhausted {
                    attempts: attempt,
                    last_error,
                },
                AttemptFailure::TimedOut(after) => RetryError::TimedOut {
                    attempts: attempt,
                    after,
                },
            });
        }

        let delay = apply_jitter(config.backoff_for(attempt), config.jitter);
        match &failure {
            AttemptFailure::Failed(e) => warn!(
                operation,
                "Retry attempt {}/{} in {:?}: {}", attempt, config.max_retries, delay, e
            ),
            AttemptFailure::TimedOut(after) => warn!(
                operation,
                "Retry attempt {}/{} in {:?}: timed out after {:?}",
                attempt,
                config.max_retries,
                delay,
                after
            ),
        }

        tokio::time::sleep(delay).await;
    }
}

fn apply_jitter(base: Duration, jitter: bool) -> Duration {
    if !jitter {
        return base;
    }
    let factor = 1.0 + rand::thread_rng().gen_range(-0.3..0.3);
    Duration::from_millis((base.as_millis() as f64 * factor) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff: Duration::from_millis(10),
            jitter: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = RetryConfig {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
            backoff_multiplier: 2.0,
            jitter: false,
            ..Default::default()
        };

        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(350));
        assert_eq!(config.backoff_for(10), Duration::from_millis(350));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        for _ in 0..100 {
            let delay = apply_jitter(Duration::from_millis(1000), true);
            assert!(delay >= Duration::from_millis(700));
            assert!(delay <= Duration::from_millis(1300));
        }
    }

    #[tokio::test]
    async fn test_retry_success_on_first_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry("first", &RetryConfig::default(), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_after_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry("flaky", &fast_config(3), move || {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Err("temporary error")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_keeps_last_error() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry("broken", &fast_config(2), move || {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move { Err::<i32, _>(format!("failure {count}")) }
        })
        .await;

        match result {
            Err(RetryError::Exhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error, "failure 2");
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_counts_as_failure() {
        let config = RetryConfig {
            attempt_timeout: Some(Duration::from_millis(50)),
            ..fast_config(1)
        };

        let result = with_retry("hanging", &config, || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, String>(())
        })
        .await;

        assert!(matches!(
            result,
            Err(RetryError::TimedOut { attempts: 2, after }) if after == Duration::from_millis(50)
        ));
    }
}
