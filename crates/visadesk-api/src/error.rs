//! Error types for the agency REST client.

use thiserror::Error;

/// REST client errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Server-side failure that may clear up on its own (5xx)
    #[error("Backend temporarily unavailable: {0}")]
    Transient(String),

    /// Request rejected for good (4xx other than the ones below)
    #[error("Backend rejected the request: {0}")]
    Permanent(String),

    /// Credentials missing or rejected (401/403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend asked us to slow down (429)
    #[error("Rate limited by backend, retry in {0}s")]
    RateLimited(u64),

    /// Network timeout
    #[error("No response within {0}s: {1}")]
    Timeout(u64, String),

    /// Nothing listening, DNS failure, TLS failure
    #[error("Could not connect to backend: {0}")]
    ConnectionFailed(String),

    /// Backend answered `success: false`
    #[error("Backend reported failure for {endpoint}")]
    Unsuccessful { endpoint: String },

    /// Bad `api` settings
    #[error("Invalid API settings: {0}")]
    ConfigError(String),

    /// Body was not the expected JSON shape
    #[error("Unexpected response body: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Any other transport failure
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl ApiError {
    /// Check if this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transient(_)
            | ApiError::Timeout(_, _)
            | ApiError::ConnectionFailed(_)
            | ApiError::RateLimited(_) => true,
            ApiError::HttpError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Failures of the transport or the server, as opposed to the request.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            ApiError::Transient(_)
                | ApiError::Timeout(_, _)
                | ApiError::ConnectionFailed(_)
                | ApiError::HttpError(_)
        )
    }

    /// One-line message suitable for an error toast.
    pub fn friendly_message(&self) -> String {
        match self {
            ApiError::Transient(msg) => {
                format!("Temporary server issue: {}. Please try again.", msg)
            }
            ApiError::Timeout(secs, _) => {
                format!("The agency server did not answer within {}s.", secs)
            }
            ApiError::ConnectionFailed(msg) => {
                format!("Cannot reach the agency server ({}).", msg)
            }
            ApiError::Unauthorized(_) => "Session rejected by the server.".to_string(),
            ApiError::RateLimited(secs) => {
                format!("Too many requests. Please wait {} seconds.", secs)
            }
            ApiError::Unsuccessful { endpoint } => {
                format!("Failed to load data from {}.", endpoint)
            }
            ApiError::HttpError(e) if e.is_timeout() => {
                "Request timed out. Check your connection.".to_string()
            }
            ApiError::HttpError(e) if e.is_connect() => {
                "Could not reach the server. Check your network.".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// What the user can do about it.
    pub fn suggested_action(&self) -> &'static str {
        match self {
            ApiError::Transient(_) => "Try again in a few seconds.",
            ApiError::Timeout(_, _) => "Check your internet connection and try again.",
            ApiError::ConnectionFailed(_) => "Verify api.base_url and network connectivity.",
            ApiError::Unauthorized(_) => "Check the token variable named by api.token_env.",
            ApiError::RateLimited(_) => "Increase refresh.interval_secs.",
            ApiError::ConfigError(_) => "Check your configuration file at ~/.visadesk/config.yaml.",
            ApiError::HttpError(e) if e.is_connect() => "Could not connect. Check your network.",
            _ => "See ~/.visadesk/logs/visadesk.log for details.",
        }
    }

    /// Classify an HTTP status code into the matching error.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            429 => ApiError::RateLimited(60),
            408 => ApiError::Timeout(30, "Request timeout".to_string()),
            500 | 502 | 503 | 504 => {
                ApiError::Transient(format!("Server error ({}): {}", status, body))
            }
            401 | 403 => ApiError::Unauthorized(format!("HTTP {}: {}", status, body)),
            404 => ApiError::NotFound(body.to_string()),
            _ => ApiError::Permanent(format!("HTTP {}: {}", status, body)),
        }
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
