//! Retry and endpoint fallback for API requests

pub mod config;
pub mod fallback;
pub mod retry;

pub use config::ResilienceConfig;
pub use fallback::{Decision, EndpointPolicy};
pub use retry::{RetryConfig, RetryPolicy};
