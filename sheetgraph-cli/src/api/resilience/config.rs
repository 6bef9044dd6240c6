//! Resilience configuration with sane defaults

use std::time::Duration;

use super::retry::RetryConfig;

/// HTTP resilience settings for [`GraphqlClient`](crate::api::GraphqlClient)
#[derive(Debug, Clone, PartialEq)]
pub struct ResilienceConfig {
    pub retry: RetryConfig,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ResilienceConfig {
    /// No retries, short timeout (for testing)
    pub fn disabled() -> Self {
        Self {
            retry: RetryConfig::disabled(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
