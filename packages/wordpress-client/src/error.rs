//! Error types for the WordPress client.

use thiserror::Error;

/// Result type for WordPress client operations.
pub type Result<T> = std::result::Result<T, WordPressError>;

/// WordPress client errors.
#[derive(Debug, Error)]
pub enum WordPressError {
    /// Configuration error (malformed site URL, bad credentials format)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network error (connection failed, DNS, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// API error: non-2xx response with the status and body WordPress returned
    #[error("WordPress API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Parse error (response body was not the expected shape)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl WordPressError {
    /// Whether a retry against the same endpoint could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            WordPressError::Timeout(_) | WordPressError::Network(_) => true,
            WordPressError::Api { status, .. } => *status == 429 || *status >= 500,
            WordPressError::Config(_) | WordPressError::Parse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        assert!(WordPressError::Api { status: 502, body: String::new() }.is_transient());
        assert!(WordPressError::Timeout(30).is_transient());
    }

    #[test]
    fn auth_failures_are_not_transient() {
        assert!(!WordPressError::Api { status: 401, body: String::new() }.is_transient());
        assert!(!WordPressError::Api { status: 400, body: String::new() }.is_transient());
    }
}
