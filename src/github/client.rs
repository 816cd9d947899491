// src/github/client.rs
// =============================================================================
// Issues authenticated GET requests against the GitHub API.
//
// Layers:
// - Transport: the raw "send a GET, give me status + headers + body" seam.
//   ReqwestTransport talks to the network; tests plug in a scripted one.
// - RequestExecutor: wraps a Transport with the rate limiter and the retry
//   policy, and turns HTTP outcomes into FetchError variants.
//
// Outcome table:
//   2xx                -> Ok(body)
//   403/429 + quota    -> wait for reset, retry once, else QuotaExceeded
//   401                -> InvalidCredential (fatal for the whole operation)
//   404                -> NotFound (normal for optional files)
//   5xx / network      -> exponential backoff, up to max_retries retries
//   anything else      -> RequestFailed(status)
// =============================================================================

use crate::error::{FetchError, Result};
use crate::github::rate_limit::RateLimiter;
use crate::stats::FetchStats;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Status, headers, and body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, headers: HeaderMap::new(), body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response (DNS, connect, reset, timeout).
#[derive(Debug, Clone, Error)]
#[error("network error: {0}")]
pub struct NetworkError(pub String);

/// Something that can perform a GET and hand back the raw response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> std::result::Result<RawResponse, NetworkError>;
}

/// Production transport backed by a shared reqwest Client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a client that sends the token, the v3 Accept header, and a
    /// User-Agent (GitHub rejects requests without one) on every call.
    pub fn new(token: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github.v3+json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("repo-sampler/", env!("CARGO_PKG_VERSION"))),
        );

        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| FetchError::Config("token contains invalid characters".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> std::result::Result<RawResponse, NetworkError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NetworkError(describe_reqwest_error(&e)))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| NetworkError(describe_reqwest_error(&e)))?;

        Ok(RawResponse { status, headers, body })
    }
}

// Timeouts and connection failures get a prefix so logs say which it was
fn describe_reqwest_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {}", error)
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}

/// Retry knobs for the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before retry n is `backoff_base * 2^n`
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, backoff_base: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(attempt))
    }
}

// How one response should be handled
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Success,
    QuotaExhausted,
    Unauthorized,
    NotFound,
    ServerError,
    Failed,
}

fn classify(response: &RawResponse, remaining: u64) -> Outcome {
    match response.status {
        200..=299 => Outcome::Success,
        401 => Outcome::Unauthorized,
        404 => Outcome::NotFound,
        403 | 429
            if remaining == 0 || response.body.to_ascii_lowercase().contains("rate limit") =>
        {
            Outcome::QuotaExhausted
        }
        500..=599 => Outcome::ServerError,
        _ => Outcome::Failed,
    }
}

/// Sends requests through a Transport with quota tracking and retries.
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
    stats: Arc<FetchStats>,
}

impl RequestExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        policy: RetryPolicy,
        stats: Arc<FetchStats>,
    ) -> Self {
        Self { transport, limiter, policy, stats }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    /// Fetches `url` and returns the response body on success.
    pub async fn execute(&self, url: &str) -> Result<String> {
        let mut attempt: u32 = 0;
        let mut quota_retried = false;

        loop {
            self.limiter.wait_if_needed().await;
            self.stats.record_api_call();

            let response = match self.transport.get(url).await {
                Ok(response) => response,
                Err(e) => {
                    if attempt < self.policy.max_retries {
                        let wait = self.policy.backoff(attempt);
                        warn!(%url, "{}, retrying in {:?}", e, wait);
                        tokio::time::sleep(wait).await;
                        attempt += 1;
                        continue;
                    }
                    error!(%url, "{}, giving up", e);
                    return Err(FetchError::Transient(e.to_string()));
                }
            };

            // Every response carries the current quota, even error responses
            self.limiter.observe(&response.headers);
            let remaining = self.limiter.snapshot().remaining;

            match classify(&response, remaining) {
                Outcome::Success => return Ok(response.body),
                Outcome::NotFound => {
                    debug!(%url, "resource not found");
                    return Err(FetchError::NotFound(url.to_string()));
                }
                Outcome::Unauthorized => {
                    error!("GitHub token is invalid or expired");
                    return Err(FetchError::InvalidCredential);
                }
                Outcome::QuotaExhausted => {
                    if quota_retried || attempt >= self.policy.max_retries {
                        error!(%url, "rate limit still exhausted after waiting");
                        return Err(FetchError::QuotaExceeded { retry_after_secs: None });
                    }
                    let wait = self.limiter.quota_wait().map_err(|e| {
                        error!(%url, "rate limit exceeded and reset time too far");
                        e
                    })?;
                    warn!(%url, "rate limited, waiting {:.0}s", wait.as_secs_f64());
                    tokio::time::sleep(wait).await;
                    quota_retried = true;
                    attempt += 1;
                }
                Outcome::ServerError => {
                    if attempt >= self.policy.max_retries {
                        error!(%url, status = response.status, "server error, giving up");
                        return Err(FetchError::Transient(format!(
                            "HTTP {} from {}",
                            response.status, url
                        )));
                    }
                    let wait = self.policy.backoff(attempt);
                    warn!(%url, status = response.status, "server error, retrying in {:?}", wait);
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Outcome::Failed => {
                    error!(%url, status = response.status, "request failed");
                    return Err(FetchError::RequestFailed {
                        status: response.status,
                        url: url.to_string(),
                    });
                }
            }
        }
    }
}
