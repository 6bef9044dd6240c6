//! Execution collaborator seam
//!
//! The import core only needs "send this request text, give me the response
//! text". Everything about endpoints, retries and authentication lives behind
//! [`Executor`].

use async_trait::async_trait;

use super::response;

/// Failure of a request against the remote API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteError {
    /// No connection could be opened, so the request was never sent
    Connect { endpoint: String, message: String },
    /// The request may have been sent but produced no usable HTTP response
    Transport { endpoint: String, message: String },
    /// The API answered with non-warning errors
    Graphql { endpoint: String, errors: Vec<String> },
    /// The response body could not be understood
    MalformedResponse(String),
    /// No endpoint was configured, or every endpoint was rejected
    NoEndpoints,
}

impl std::fmt::Display for ExecuteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecuteError::Connect { endpoint, message } => {
                write!(f, "cannot connect to {}: {}", endpoint, message)
            }
            ExecuteError::Transport { endpoint, message } => {
                write!(f, "request to {} failed: {}", endpoint, message)
            }
            ExecuteError::Graphql { endpoint, errors } => {
                write!(f, "{} returned errors: {}", endpoint, errors.join("; "))
            }
            ExecuteError::MalformedResponse(message) => {
                write!(f, "malformed response: {}", message)
            }
            ExecuteError::NoEndpoints => write!(f, "no endpoint accepted the request"),
        }
    }
}

impl std::error::Error for ExecuteError {}

/// Whether sending `request` twice is harmless
///
/// Lookups are; mutations are not, since a resend after a timeout may create
/// the same record twice.
pub fn is_idempotent(request: &str) -> bool {
    !request.trim_start().starts_with("mutation")
}

/// Sends query and mutation text to the remote API
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute one request, returning the raw response body on success
    async fn execute(&self, request: &str) -> Result<String, ExecuteError>;

    /// Extract `(attribute value, identifier)` pairs from a lookup response
    ///
    /// Pairs are returned in response order, duplicates included.
    fn extract_ids(
        &self,
        response: &str,
        attribute: &str,
    ) -> Result<Vec<(String, String)>, ExecuteError> {
        response::extract_ids(response, attribute)
    }
}
