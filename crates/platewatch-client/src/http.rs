//! Retry/backoff request execution shared by every outbound HTTP call.
//!
//! One logical request is executed with a bounded retry budget and
//! exponential backoff. Failures are classified into [`ClientError::Api`]
//! before the retry decision is made, so transport faults, bad statuses,
//! and undeserializable payloads all flow through the same policy. An
//! HTTP 401 triggers a single credential refresh through the configured
//! [`TokenRefresher`] before the next attempt.

use crate::error::{status_message, ClientError, Result};
use crate::traits::TokenRefresher;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Retry budget and backoff base for one request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles for each one after
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Policy for JSON API endpoints: 5 attempts from a 1s base.
    #[must_use]
    pub fn api() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
        }
    }

    /// Policy for fragile portal endpoints: 3 attempts from a 1s base.
    #[must_use]
    pub fn portal() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }

    /// Backoff before the attempt with the given zero-based index.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

async fn sleep_cancellable(delay: Duration, cancel: Option<&CancellationToken>) -> Result<()> {
    match cancel {
        Some(token) => tokio::select! {
            () = token.cancelled() => Err(ClientError::Cancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        },
        None => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}

/// Run one logical request through the retry policy.
///
/// `attempt` performs exactly one attempt. Classified failures retry up
/// to the budget; a 401 takes the one-shot refresh path; cancellation
/// (from the token racing the backoff sleeps, or surfaced by the attempt
/// itself) propagates immediately.
pub async fn execute_with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    refresher: Option<&dyn TokenRefresher>,
    cancel: Option<&CancellationToken>,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut refreshed = false;
    let mut last_failure: Option<ClientError> = None;

    for index in 0..policy.max_attempts {
        if index > 0 {
            sleep_cancellable(policy.delay_before(index), cancel).await?;
        }

        let failure = match attempt().await {
            Ok(value) => return Ok(value),
            Err(ClientError::Cancelled) => return Err(ClientError::Cancelled),
            Err(failure) => failure,
        };

        if failure.is_unauthorized() {
            // One refresh per logical request; a second 401 means the
            // credential itself is bad.
            if refreshed {
                return Err(failure);
            }
            let Some(refresher) = refresher else {
                return Err(failure);
            };

            warn!(
                attempt = index + 1,
                max_attempts = policy.max_attempts,
                "received 401, attempting credential refresh"
            );
            refreshed = true;
            if !refresher.refresh().await {
                error!("credential refresh failed, returning 401");
                return Err(failure);
            }
            last_failure = Some(failure);
            continue;
        }

        if index + 1 >= policy.max_attempts {
            return Err(failure);
        }

        warn!(
            attempt = index + 1,
            max_attempts = policy.max_attempts,
            error = %failure,
            "request failed, retrying"
        );
    }

    // Reachable only when the final attempt took the refresh path.
    Err(last_failure.unwrap_or_else(|| ClientError::api(500, "retry budget exhausted")))
}

/// Send one request and parse the JSON body, classifying every failure.
async fn send_and_parse<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            error!("request timeout");
            return Err(ClientError::api(408, "Request timeout"));
        }
        Err(e) => {
            error!(error = %e, "HTTP request failed");
            return Err(ClientError::api(500, format!("HTTP request failed: {e}")));
        }
    };

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ClientError::api(500, format!("failed to read response body: {e}")))?;

    debug!(status = status.as_u16(), "response received");

    if !status.is_success() {
        return Err(ClientError::api(
            status.as_u16(),
            status_message(status.as_u16(), &body),
        ));
    }

    if body.is_empty() {
        warn!("received empty response content");
        return Err(ClientError::api(204, "Empty response content"));
    }

    serde_json::from_str(&body).map_err(|e| {
        warn!(error = %e, "failed to deserialize response");
        ClientError::api(422, format!("JSON deserialization failed: {e}"))
    })
}

/// Standard `{reason, message, result}` envelope the fleet backend wraps
/// responses in. Reason `0` is success.
#[derive(Debug, Deserialize)]
pub struct BackendEnvelope<T> {
    /// Backend reason code, `0` on success
    #[serde(default)]
    pub reason: i32,
    /// Failure description when `reason` is non-zero
    #[serde(default)]
    pub message: Option<String>,
    /// Payload when `reason` is `0`
    #[serde(default = "Option::default")]
    pub result: Option<T>,
}

impl<T> BackendEnvelope<T> {
    /// Unwrap the envelope into its payload or a classified failure.
    pub fn into_result(self) -> Result<T> {
        if self.reason != 0 {
            let status = u16::try_from(self.reason).unwrap_or(500);
            return Err(ClientError::api(
                status,
                self.message
                    .unwrap_or_else(|| format!("backend reason {}", self.reason)),
            ));
        }

        self.result
            .ok_or_else(|| ClientError::api(204, "Empty response content"))
    }
}

/// Shared HTTP execution: a pooled client plus a retry policy and an
/// optional credential refresher.
#[derive(Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    policy: RetryPolicy,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl std::fmt::Debug for HttpExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExecutor")
            .field("policy", &self.policy)
            .field("has_refresher", &self.refresher.is_some())
            .finish()
    }
}

impl HttpExecutor {
    /// Per-attempt wall-clock ceiling on one HTTP round trip.
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create an executor with the given retry policy.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .expect("construct HTTP client");

        Self {
            client,
            policy,
            refresher: None,
        }
    }

    /// Attach a credential refresher for the 401 path.
    #[must_use]
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// The underlying `reqwest` client, for building requests.
    #[must_use]
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Execute a request with retries, parsing the body as bare JSON.
    ///
    /// `build` constructs a fresh request for each attempt so per-attempt
    /// state (like a refreshed bearer token) is picked up.
    pub async fn execute_json<T, F>(&self, cancel: Option<&CancellationToken>, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        execute_with_retries(&self.policy, self.refresher.as_deref(), cancel, || {
            let request = build();
            async move { send_and_parse::<T>(request).await }
        })
        .await
    }

    /// Execute a request with retries, unwrapping the backend envelope.
    ///
    /// Envelope unwrapping happens inside each attempt so an enveloped
    /// 401 still takes the refresh path.
    pub async fn execute_enveloped<T, F>(
        &self,
        cancel: Option<&CancellationToken>,
        build: F,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        execute_with_retries(&self.policy, self.refresher.as_deref(), cancel, || {
            let request = build();
            async move { send_and_parse::<BackendEnvelope<T>>(request).await?.into_result() }
        })
        .await
    }
}
