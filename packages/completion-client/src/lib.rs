//! Pure REST client for OpenAI-compatible chat completion APIs
//!
//! A clean, minimal client with no domain-specific logic. Every request
//! carries a timeout; a timed-out request surfaces as
//! [`CompletionError::Timeout`] so callers can treat it as transient.
//!
//! # Example
//!
//! ```rust,ignore
//! use completion_client::{CompletionClient, ChatRequest, Message};
//!
//! let client = CompletionClient::from_env()?;
//!
//! let response = client.chat_completion(
//!     ChatRequest::new("gpt-4o-mini")
//!         .message(Message::system("You are a writer"))
//!         .message(Message::user("Write a haiku about Rust")),
//! ).await?;
//!
//! println!("{}", response.content);
//! ```

pub mod error;
pub mod types;

pub use error::{CompletionError, Result};
pub use types::{ChatRequest, ChatResponse, Message, Usage};

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Chat completion API client.
#[derive(Clone)]
pub struct CompletionClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    timeout_secs: u64,
}

impl CompletionClient {
    /// Create a new client with the given API key and the default timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new client with an explicit request timeout.
    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| CompletionError::Config("OPENAI_API_KEY not set".into()))?;
        Self::new(api_key)
    }

    /// Set a custom base URL (for Azure, proxies, compatible providers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat completion.
    ///
    /// Send messages to the chat completion API and get a response.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    warn!(timeout_secs = self.timeout_secs, "completion request timed out");
                    CompletionError::Timeout(self.timeout_secs)
                } else {
                    warn!(error = %e, "completion request failed");
                    CompletionError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %message, "completion API error");
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat_response: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CompletionError::Parse("response contained no choices".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            "chat completion"
        );

        Ok(ChatResponse {
            content,
            usage: chat_response.usage,
        })
    }
}
