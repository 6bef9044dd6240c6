//! GraphQL API access
//!
//! The import core talks to the remote object graph only through the
//! [`Executor`] trait. [`GraphqlClient`] is the HTTP implementation, with
//! retries and primary/secondary endpoint fallback.

pub mod client;
pub mod executor;
pub mod resilience;
pub mod response;

pub use client::{Credentials, GraphqlClient};
pub use executor::{ExecuteError, Executor};
pub use resilience::{EndpointPolicy, ResilienceConfig, RetryConfig};
pub use response::{GraphqlResponse, ResponseClass};
