//! The HTTP-call seam between the engines and the network.
//!
//! Paginators and the batch engine never touch reqwest directly; they issue
//! `(method, path, query, body)` calls through [`Transport`] and interpret the
//! `(status, json)` reply themselves. [`crate::TrackerClient`] is the real
//! implementation.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, TrackerError};

pub use reqwest::Method;

/// A raw reply from the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body (`Null` for an empty body, a JSON string for non-JSON text).
    pub body: Value,
    /// Value of the `Retry-After` header, in seconds.
    pub retry_after_secs: Option<u64>,
}

impl ApiResponse {
    /// A 200 reply with the given body.
    pub fn ok(body: Value) -> Self {
        Self::with_status(200, body)
    }

    /// A reply with an arbitrary status.
    pub fn with_status(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            retry_after_secs: None,
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Machine-readable error code from the body (`code`, falling back to `error`).
    pub fn error_code(&self) -> Option<&str> {
        self.body
            .get("code")
            .or_else(|| self.body.get("error"))
            .and_then(Value::as_str)
    }

    /// Convert a non-2xx reply into the matching [`TrackerError`].
    ///
    /// `path` is only used to describe 404s.
    pub fn error_for_status(self, path: &str) -> Result<Value> {
        if self.is_success() {
            return Ok(self.body);
        }

        match self.status {
            429 => Err(TrackerError::RateLimited {
                retry_after_secs: self.retry_after_secs,
            }),
            401 | 403 => Err(TrackerError::PermissionDenied {
                message: self.error_message(),
                status_code: self.status,
            }),
            404 => Err(TrackerError::NotFound {
                path: path.to_string(),
            }),
            status => Err(TrackerError::ApiError {
                message: self.error_message(),
                status_code: Some(status),
            }),
        }
    }

    /// Extract a human-readable message from an error body.
    fn error_message(&self) -> String {
        if let Some(msg) = self.body.get("message").and_then(Value::as_str) {
            return msg.to_string();
        }
        if let Some(err) = self.body.get("error").and_then(Value::as_str) {
            return err.to_string();
        }
        match &self.body {
            Value::Null => format!("HTTP {}", self.status),
            Value::String(text) if text.trim().is_empty() => format!("HTTP {}", self.status),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// The HTTP-call collaborator.
///
/// Implementations own authentication, TLS, timeouts and transport-level
/// retry. `Err` is reserved for failures where no HTTP reply was obtained;
/// error statuses come back as an [`ApiResponse`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one call.
    async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<ApiResponse>;
}
