//! Tracker API client.
//!
//! Low-level HTTP client that handles authentication, timeouts and retry of
//! idempotent calls. Paging and batch semantics live above it, behind the
//! [`Transport`] trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Result, TrackerError};
use crate::transport::{ApiResponse, Method, Transport};

const USER_AGENT: &str = concat!("trackapi/", env!("CARGO_PKG_VERSION"));

/// First retry delay; doubled on every further attempt.
const INITIAL_BACKOFF: Duration = Duration::from_millis(200);

/// Upper bound for a single retry delay, including `Retry-After`.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Low-level tracker API client.
///
/// This struct is cheaply cloneable; clones reference the same underlying
/// connection pool.
///
/// # Example
///
/// ```no_run
/// use trackapi::TrackerClient;
///
/// # fn example() -> trackapi::Result<()> {
/// // Create from environment variables
/// let client = TrackerClient::from_env()?;
///
/// // Or configure manually
/// let client = TrackerClient::new("your-token", "https://tracker.example.com/api/v1")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TrackerClient {
    http: Client,
    base_url: Arc<Url>,
    token: String,
    max_retries: u32,
}

impl std::fmt::Debug for TrackerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerClient")
            .field("base_url", &self.base_url.as_str())
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl TrackerClient {
    /// Create a client from `TRACKER_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `TRACKER_API_TOKEN` is not set.
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Create a new client with the provided token and base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid.
    pub fn new(token: &str, base_url: &str) -> Result<Self> {
        Self::with_config(ClientConfig::new(token, base_url))
    }

    /// Create a client from an explicit config.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        // Ensure base URL ends with /
        let base_url_str = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };

        let base_url = Url::parse(&base_url_str)?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .timeout(config.timeout)
            .build()
            .map_err(TrackerError::HttpError)?;

        Ok(Self {
            http,
            base_url: Arc::new(base_url),
            token: config.token,
            max_retries: config.max_retries,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> std::result::Result<Response, reqwest::Error> {
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(&self.token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await
    }

    /// Read a response into an [`ApiResponse`], tolerating empty and non-JSON bodies.
    async fn read_response(response: Response) -> Result<ApiResponse> {
        let status = response.status().as_u16();
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());

        let text = response.text().await.map_err(TrackerError::HttpError)?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(ApiResponse {
            status,
            body,
            retry_after_secs,
        })
    }
}

#[async_trait]
impl Transport for TrackerClient {
    #[tracing::instrument(skip(self, query, body), fields(params = query.len()))]
    async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<ApiResponse> {
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        let retryable_method = is_idempotent(&method);
        let mut attempt: u32 = 0;

        loop {
            let can_retry = retryable_method && attempt < self.max_retries;

            match self.send_once(&method, &url, query, body).await {
                Ok(response) => {
                    let response = Self::read_response(response).await?;
                    if can_retry && is_retryable_status(response.status) {
                        let delay = backoff_delay(attempt, response.retry_after_secs);
                        tracing::warn!(
                            status = response.status,
                            attempt = attempt + 1,
                            "Retrying {} {} in {:?}",
                            method,
                            path,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) if can_retry && (e.is_timeout() || e.is_connect()) => {
                    let delay = backoff_delay(attempt, None);
                    tracing::warn!(
                        attempt = attempt + 1,
                        "Transport error on {} {}: {}; retrying in {:?}",
                        method,
                        path,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(TrackerError::HttpError(e)),
            }
        }
    }
}

/// Only calls that can be repeated without side effects are retried.
fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::DELETE)
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn backoff_delay(attempt: u32, retry_after_secs: Option<u64>) -> Duration {
    let delay = match retry_after_secs {
        Some(secs) => Duration::from_secs(secs),
        None => INITIAL_BACKOFF.saturating_mul(2u32.saturating_pow(attempt)),
    };
    delay.min(MAX_BACKOFF)
}
