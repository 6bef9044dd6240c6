//! Endpoint fallback policy
//!
//! Endpoints are tried in order and the first success wins. An endpoint that
//! cannot be reached, or that does not expose the requested operation, hands
//! over to the next one; a real GraphQL error stops immediately. A mutation
//! that failed after it may have been sent is never replayed elsewhere.

use crate::api::executor::ExecuteError;
use crate::api::response::ResponseClass;

/// What to do after one endpoint answered (or failed to)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept,
    TryNext,
    Fail,
}

/// Ordered list of endpoints plus the rules for moving between them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPolicy {
    endpoints: Vec<String>,
}

impl EndpointPolicy {
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints
                .into_iter()
                .map(Into::into)
                .filter(|e: &String| !e.trim().is_empty())
                .collect(),
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Decide based on a classified response
    pub fn decide(&self, class: &ResponseClass) -> Decision {
        match class {
            ResponseClass::Success { .. } => Decision::Accept,
            ResponseClass::Soft { .. } => Decision::TryNext,
            ResponseClass::Hard { .. } => Decision::Fail,
        }
    }

    /// Decide based on a request failure
    pub fn decide_error(&self, error: &ExecuteError, idempotent: bool) -> Decision {
        match error {
            ExecuteError::Connect { .. } => Decision::TryNext,
            ExecuteError::Transport { .. } if idempotent => Decision::TryNext,
            _ => Decision::Fail,
        }
    }
}
