//! Client configuration.
//!
//! Values come from environment variables or are set explicitly; the CLI
//! layers its own flags over the same variables.

use std::env;
use std::time::Duration;

use crate::error::{Result, TrackerError};

/// Default base URL of the tracker API.
pub const DEFAULT_API_URL: &str = "https://tracker.example.com/api/v1";

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retries for idempotent calls.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Environment variable holding the API token.
pub const ENV_TOKEN: &str = "TRACKER_API_TOKEN";
/// Environment variable overriding the base URL.
pub const ENV_URL: &str = "TRACKER_API_URL";
/// Environment variable overriding the per-call timeout (seconds).
pub const ENV_TIMEOUT: &str = "TRACKER_TIMEOUT_SECS";
/// Environment variable overriding the retry count.
pub const ENV_MAX_RETRIES: &str = "TRACKER_MAX_RETRIES";

/// Settings for [`crate::TrackerClient`].
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the API (a trailing slash is added when missing).
    pub base_url: String,
    /// Bearer token.
    pub token: String,
    /// Timeout applied to each HTTP call.
    pub timeout: Duration,
    /// Retries for idempotent calls (GET, DELETE) on 429/5xx and transport errors.
    pub max_retries: u32,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    /// Create a config with default timeout and retries.
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Read the config from `TRACKER_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `TRACKER_API_TOKEN` is not set, or if a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self> {
        let token = env::var(ENV_TOKEN).map_err(|_| {
            TrackerError::ConfigMissing(format!("{ENV_TOKEN} environment variable not set"))
        })?;
        let base_url = env::var(ENV_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let mut config = Self::new(token, base_url);
        if let Some(secs) = parse_env::<u64>(ENV_TIMEOUT)? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_env::<u32>(ENV_MAX_RETRIES)? {
            config.max_retries = retries;
        }
        Ok(config)
    }

    /// Set the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry budget for idempotent calls.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| {
            TrackerError::InvalidArgument(format!("{name} must be a number, got '{raw}'"))
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let config = ClientConfig::new("tok", "http://localhost:9000");
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::new("tok", "http://localhost:9000")
            .with_timeout(Duration::from_secs(5))
            .with_max_retries(0);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_debug_hides_token() {
        let config = ClientConfig::new("secret-token", "http://localhost:9000");
        let debug = format!("{config:?}");
        assert!(debug.contains("base_url"));
        assert!(!debug.contains("secret-token"));
    }
}
