//! Retry with exponential backoff for transport failures
//!
//! A request that may already have reached the server is only resent when
//! it is idempotent. Connection failures are always retried.

use std::future::Future;
use std::time::Duration;

use crate::api::executor::ExecuteError;

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts per endpoint, first try included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(10_000),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no waiting
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            backoff_multiplier: 1.0,
        }
    }

    /// Delay before retry number `retry` (1 for the first retry)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self
            .backoff_multiplier
            .max(1.0)
            .powi(retry.saturating_sub(1) as i32);
        let millis = (self.base_delay.as_millis() as f64 * factor).min(self.max_delay.as_millis() as f64);
        Duration::from_millis(millis as u64)
    }
}

/// Whether an error is worth retrying against the same endpoint
pub fn is_retryable(error: &ExecuteError, idempotent: bool) -> bool {
    match error {
        ExecuteError::Connect { .. } => true,
        ExecuteError::Transport { .. } => idempotent,
        _ => false,
    }
}

/// Applies a [`RetryConfig`] to async operations
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        idempotent: bool,
        mut operation: F,
    ) -> Result<T, ExecuteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExecuteError>>,
    {
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < attempts && is_retryable(&err, idempotent) => {
                    let delay = self.config.delay_for(attempt);
                    log::warn!(
                        "{} failed (attempt {}/{}): {} - retrying in {:?}",
                        label,
                        attempt,
                        attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transport() -> ExecuteError {
        ExecuteError::Transport {
            endpoint: "http://primary".to_string(),
            message: "operation timed out".to_string(),
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            backoff_multiplier: 2.0,
        };
        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(2), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(300));
        assert_eq!(config.delay_for(4), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_retries_transport_errors_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            backoff_multiplier: 1.0,
        });
        let result = policy
            .run("lookup", true, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err(transport()) } else { Ok(n) } }
            })
            .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 2,
            ..RetryConfig::disabled()
        });
        let result: Result<(), _> = policy
            .run("lookup", true, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transport()) }
            })
            .await;
        assert_eq!(result, Err(transport()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_does_not_retry_graphql_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let result: Result<(), _> = policy
            .run("mutation", false, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ExecuteError::Graphql {
                        endpoint: "http://primary".to_string(),
                        errors: vec!["boom".to_string()],
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mutation_is_not_resent_after_transport_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 3,
            ..RetryConfig::disabled()
        });
        let result: Result<(), _> = policy
            .run("mutation", false, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transport()) }
            })
            .await;
        assert_eq!(result, Err(transport()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mutation_is_retried_when_connection_fails() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 3,
            ..RetryConfig::disabled()
        });
        let result = policy
            .run("mutation", false, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ExecuteError::Connect {
                            endpoint: "http://primary".to_string(),
                            message: "connection refused".to_string(),
                        })
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
