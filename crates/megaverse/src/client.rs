//! Async HTTP client wrapping reqwest.
//!
//! POSTs JSON payloads to the action endpoints, driving each request through
//! the [`RetryState`] machine: backoff on 429, immediate retry on other
//! failures, one shared budget.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use crate::retry::{AttemptOutcome, Phase, RetryPolicy, RetryState};
use crate::types::{MegaverseError, MegaverseResult, RequestPayload};

/// HTTP client for the goal source and action endpoints.
#[derive(Clone)]
pub struct MegaverseClient {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl MegaverseClient {
    /// Create a client. Without a timeout, calls wait as long as the
    /// underlying connection allows.
    pub fn new(policy: RetryPolicy, timeout: Option<Duration>) -> Self {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().unwrap_or_default();

        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST `payload` to `url` with retries, returning the parsed response body.
    ///
    /// Fails with [`MegaverseError::RetriesExhausted`] once the retry budget
    /// is spent, or [`MegaverseError::Decode`] if a successful body is not JSON.
    pub async fn execute(&self, url: &str, payload: &RequestPayload) -> MegaverseResult<Value> {
        tracing::info!(
            "POST {url} {}",
            serde_json::to_string(payload).unwrap_or_default()
        );

        let mut state = RetryState::new(&self.policy);
        let response = loop {
            let outcome = self.attempt(url, payload).await;
            match state.transition(outcome) {
                Phase::Succeeded(response) => break response,
                Phase::BackingOff(wait) => {
                    tracing::warn!(
                        "Too Many Requests: retrying in {:.1} seconds (retry {}/{})",
                        wait.as_secs_f64(),
                        state.retries(),
                        self.policy.max_retries
                    );
                    tokio::time::sleep(wait).await;
                }
                Phase::Attempting => {
                    tracing::debug!(
                        "retrying {url} (retry {}/{})",
                        state.retries(),
                        self.policy.max_retries
                    );
                }
                Phase::Exhausted(err) => return Err(err),
            }
        };

        let body = decode_body(response).await?;
        tracing::info!("response from {url}: {body}");
        Ok(body)
    }

    async fn attempt(
        &self,
        url: &str,
        payload: &RequestPayload,
    ) -> AttemptOutcome<reqwest::Response> {
        match self.client.post(url).json(payload).send().await {
            Ok(r) => {
                let status = r.status();
                if status.is_success() {
                    AttemptOutcome::Success(r)
                } else if status == StatusCode::TOO_MANY_REQUESTS {
                    AttemptOutcome::RateLimited
                } else {
                    let err = MegaverseError::Http {
                        status: status.as_u16(),
                    };
                    tracing::warn!("{url}: {err}");
                    AttemptOutcome::Failed(err)
                }
            }
            Err(e) => {
                tracing::warn!("{url}: request failed: {e}");
                AttemptOutcome::Failed(e.into())
            }
        }
    }
}

/// Parse a response body as JSON. An empty body yields `Value::Null`.
pub(crate) async fn decode_body(response: reqwest::Response) -> MegaverseResult<Value> {
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| MegaverseError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = MegaverseClient::new(RetryPolicy::default(), None);
        assert_eq!(client.policy().max_retries, 3);
        assert_eq!(client.policy().base_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_client_with_timeout() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(10),
        };
        let client = MegaverseClient::new(policy, Some(Duration::from_secs(5)));
        assert_eq!(client.policy(), &policy);
    }
}
