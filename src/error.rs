//! Error types for tracker API operations.

use thiserror::Error;

/// Errors that can occur while talking to the tracker or processing batch files.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Configuration is missing or incomplete.
    #[error("Tracker configuration required: {0}")]
    ConfigMissing(String),

    /// A caller-supplied argument was rejected before any request was made.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A pagination cursor is stale or was issued for a different query.
    ///
    /// Pagination must restart from an empty cursor.
    #[error("Cursor for '{endpoint}' is no longer valid; restart the listing without a cursor")]
    InvalidCursor { endpoint: String },

    /// API request failed.
    #[error("Tracker API error: {message}")]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// The token is missing, expired, or lacks permission.
    #[error("Permission denied ({status_code}): {message}")]
    PermissionDenied { message: String, status_code: u16 },

    /// The addressed resource does not exist.
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// HTTP transport error (connect, TLS, timeout).
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("Failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// Local file I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV batch file error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// YAML batch file error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Batch file extension is not one of csv, json, yaml, yml.
    #[error("Unsupported batch file format '{0}': expected .csv, .json, .yaml or .yml")]
    UnsupportedFormat(String),
}

impl TrackerError {
    /// Whether this is a request failure (transport or HTTP status).
    ///
    /// Local validation and file errors return false.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            TrackerError::ApiError { .. }
                | TrackerError::PermissionDenied { .. }
                | TrackerError::NotFound { .. }
                | TrackerError::RateLimited { .. }
                | TrackerError::HttpError(_)
                | TrackerError::ParseError(_)
        )
    }

    /// HTTP status behind this error, when there is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TrackerError::ApiError { status_code, .. } => *status_code,
            TrackerError::PermissionDenied { status_code, .. } => Some(*status_code),
            TrackerError::NotFound { .. } => Some(404),
            TrackerError::RateLimited { .. } => Some(429),
            TrackerError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for tracker operations.
pub type Result<T> = core::result::Result<T, TrackerError>;
