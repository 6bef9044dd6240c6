//! HTTP GraphQL client with endpoint fallback

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::executor::{ExecuteError, Executor, is_idempotent};
use super::resilience::{Decision, EndpointPolicy, ResilienceConfig, RetryPolicy};
use super::response::{ResponseClass, classify, parse_response};

/// Basic-auth credentials
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Sends requests to an ordered list of GraphQL endpoints
#[derive(Debug, Clone)]
pub struct GraphqlClient {
    http: Client,
    policy: EndpointPolicy,
    retry: RetryPolicy,
    credentials: Option<Credentials>,
}

impl GraphqlClient {
    pub fn new(
        policy: EndpointPolicy,
        credentials: Option<Credentials>,
        resilience: ResilienceConfig,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(resilience.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            policy,
            retry: RetryPolicy::new(resilience.retry),
            credentials,
        })
    }

    pub fn endpoints(&self) -> &[String] {
        self.policy.endpoints()
    }

    /// One POST to one endpoint, no retries
    async fn post(&self, endpoint: &str, request: &str) -> Result<String, ExecuteError> {
        let transport = |message: String| ExecuteError::Transport {
            endpoint: endpoint.to_string(),
            message,
        };

        let mut builder = self
            .http
            .post(endpoint)
            .header("Accept", "application/json")
            .json(&json!({ "query": request }));
        if let Some(credentials) = &self.credentials {
            builder = builder.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                ExecuteError::Connect {
                    endpoint: endpoint.to_string(),
                    message: e.to_string(),
                }
            } else {
                transport(e.to_string())
            }
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| transport(e.to_string()))?;

        if status.is_server_error() {
            return Err(transport(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }
        if !status.is_success() && parse_response(&body).is_err() {
            return Err(ExecuteError::MalformedResponse(format!(
                "HTTP {} from {}: {}",
                status,
                endpoint,
                body.chars().take(200).collect::<String>()
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl Executor for GraphqlClient {
    async fn execute(&self, request: &str) -> Result<String, ExecuteError> {
        let mut last_error = ExecuteError::NoEndpoints;
        let idempotent = is_idempotent(request);

        for endpoint in self.policy.endpoints() {
            log::debug!("Sending request to {}:\n{}", endpoint, request);
            let outcome = self
                .retry
                .run(endpoint, idempotent, || self.post(endpoint, request))
                .await;

            let body = match outcome {
                Ok(body) => body,
                Err(err) => match self.policy.decide_error(&err, idempotent) {
                    Decision::TryNext => {
                        log::warn!("{} - trying next endpoint", err);
                        last_error = err;
                        continue;
                    }
                    _ => return Err(err),
                },
            };

            let class = classify(&parse_response(&body)?);
            match self.policy.decide(&class) {
                Decision::Accept => {
                    if let ResponseClass::Success { warnings } = &class {
                        for warning in warnings {
                            log::warn!("GraphQL warning from {}: {}", endpoint, warning);
                        }
                    }
                    return Ok(body);
                }
                Decision::TryNext => {
                    log::info!(
                        "Endpoint {} does not expose this operation, trying next endpoint",
                        endpoint
                    );
                    if let ResponseClass::Soft { errors } = class {
                        last_error = ExecuteError::Graphql {
                            endpoint: endpoint.clone(),
                            errors,
                        };
                    }
                }
                Decision::Fail => {
                    let errors = match class {
                        ResponseClass::Hard { errors } | ResponseClass::Soft { errors } => errors,
                        ResponseClass::Success { .. } => Vec::new(),
                    };
                    for error in &errors {
                        log::error!("GraphQL error from {}: {}", endpoint, error);
                    }
                    return Err(ExecuteError::Graphql {
                        endpoint: endpoint.clone(),
                        errors,
                    });
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::resilience::RetryConfig;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Accepts connections and never answers; returns its URL and accept count
    async fn silent_server() -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/graphql", listener.local_addr().unwrap());
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
            }
        });
        (url, accepted)
    }

    fn impatient_client(endpoints: [&str; 2]) -> GraphqlClient {
        GraphqlClient::new(
            EndpointPolicy::new(endpoints),
            None,
            ResilienceConfig::default()
                .with_timeout(Duration::from_millis(200))
                .with_retry(RetryConfig {
                    max_attempts: 3,
                    ..RetryConfig::disabled()
                }),
        )
        .unwrap()
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials {
            username: "admin".to_string(),
            password: "secret".to_string(),
        };
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("secret"));
    }

    #[tokio::test]
    async fn test_no_endpoints() {
        let client = GraphqlClient::new(
            EndpointPolicy::new(Vec::<String>::new()),
            None,
            ResilienceConfig::disabled(),
        )
        .unwrap();
        assert_eq!(
            client.execute("query { x }").await,
            Err(ExecuteError::NoEndpoints)
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connect_error() {
        let client = GraphqlClient::new(
            EndpointPolicy::new(["http://127.0.0.1:9/graphql"]),
            None,
            ResilienceConfig::disabled().with_retry(RetryConfig::disabled()),
        )
        .unwrap();
        let err = client.execute("query { x }").await.unwrap_err();
        assert!(matches!(err, ExecuteError::Connect { ref endpoint, .. } if endpoint == "http://127.0.0.1:9/graphql"));
    }

    #[tokio::test]
    async fn test_timed_out_mutation_is_sent_once() {
        let (primary, primary_hits) = silent_server().await;
        let (secondary, secondary_hits) = silent_server().await;
        let client = impatient_client([primary.as_str(), secondary.as_str()]);

        let err = client
            .execute("mutation { Region___create(data: { nome: \"North\" }) { _id } }")
            .await
            .unwrap_err();
        assert!(matches!(err, ExecuteError::Transport { .. }));
        assert_eq!(primary_hits.load(Ordering::SeqCst), 1);
        assert_eq!(secondary_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timed_out_lookup_is_retried_then_moves_on() {
        let (primary, primary_hits) = silent_server().await;
        let (secondary, secondary_hits) = silent_server().await;
        let client = impatient_client([primary.as_str(), secondary.as_str()]);

        let err = client.execute("query { x }").await.unwrap_err();
        assert!(matches!(err, ExecuteError::Transport { ref endpoint, .. } if *endpoint == secondary));
        assert_eq!(primary_hits.load(Ordering::SeqCst), 3);
        assert_eq!(secondary_hits.load(Ordering::SeqCst), 3);
    }
}
