//! Pure WordPress REST API client.
//!
//! A minimal client for the `wp-json/wp/v2` posts endpoint, authenticating
//! with an application password over Basic Auth. Non-2xx responses surface
//! as [`WordPressError::Api`] carrying the status code and the body
//! WordPress returned, so callers can decide whether to retry.
//!
//! # Example
//!
//! ```rust,ignore
//! use wordpress_client::{NewPost, WordPressClient};
//!
//! let client = WordPressClient::new(
//!     "https://blog.example.com",
//!     "editor",
//!     "abcd efgh ijkl mnop",
//! )?;
//!
//! let post = client
//!     .create_post(&NewPost::publish("Hello", "<p>World</p>"))
//!     .await?;
//! println!("published at {}", post.link);
//! ```

pub mod error;
pub mod types;

pub use error::{Result, WordPressError};
pub use types::{NewPost, PostResponse};

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// WordPress REST API client.
#[derive(Clone)]
pub struct WordPressClient {
    http_client: Client,
    base_url: String,
    username: String,
    app_password: String,
    timeout_secs: u64,
}

impl WordPressClient {
    /// Create a new client for the given site with the default timeout.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        app_password: impl Into<String>,
    ) -> Result<Self> {
        Self::with_timeout(
            base_url,
            username,
            app_password,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create a new client with an explicit request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        username: impl Into<String>,
        app_password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WordPressError::Config(format!("failed to build HTTP client: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(WordPressError::Config("site URL must not be empty".into()));
        }

        Ok(Self {
            http_client,
            base_url,
            username: username.into(),
            app_password: app_password.into(),
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Get the site base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a post.
    pub async fn create_post(&self, post: &NewPost) -> Result<PostResponse> {
        let url = format!("{}/wp-json/wp/v2/posts", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.username, Some(&self.app_password))
            .json(post)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    warn!(timeout_secs = self.timeout_secs, "WordPress request timed out");
                    WordPressError::Timeout(self.timeout_secs)
                } else {
                    warn!(error = %e, "WordPress request failed");
                    WordPressError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "WordPress API error");
            return Err(WordPressError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let created: PostResponse = response
            .json()
            .await
            .map_err(|e| WordPressError::Parse(e.to_string()))?;

        debug!(post_id = created.id, link = %created.link, "post created");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_strips_trailing_slash_from_site_url() {
        let client =
            WordPressClient::new("https://blog.example.com/", "editor", "secret").unwrap();
        assert_eq!(client.base_url(), "https://blog.example.com");
    }

    #[test]
    fn empty_site_url_is_rejected() {
        let result = WordPressClient::new("", "editor", "secret");
        assert!(matches!(result, Err(WordPressError::Config(_))));
    }
}
