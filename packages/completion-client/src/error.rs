//! Error types for the completion client.

use thiserror::Error;

/// Result type for completion client operations.
pub type Result<T> = std::result::Result<T, CompletionError>;

/// Completion client errors.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network error (connection failed, DNS, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// API error (non-2xx response, rate limit, invalid request)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl CompletionError {
    /// Whether a retry against the same endpoint could plausibly succeed.
    ///
    /// Timeouts, transport failures, rate limits, and server-side errors are
    /// transient. Client-side errors (auth, bad request) and parse failures
    /// are not.
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Timeout(_) | CompletionError::Network(_) => true,
            CompletionError::Api { status, .. } => *status == 429 || *status >= 500,
            CompletionError::Config(_) | CompletionError::Parse(_) => false,
        }
    }
}
