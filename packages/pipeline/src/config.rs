use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use crate::router::SiteConfig;

/// Runtime configuration for the pipeline worker.
///
/// Credentials and URLs live here, injected from the environment; nothing
/// is embedded in source.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub openai_model: String,
    pub wordpress_url: String,
    pub wordpress_username: String,
    pub wordpress_app_password: String,
    /// How long the worker sleeps when the queue is empty
    pub poll_interval_secs: u64,
    /// Age past which a processing job is considered abandoned
    pub processing_timeout_secs: u64,
    /// How often the sweeper looks for abandoned jobs
    pub sweep_interval_secs: u64,
    /// Timeout applied to every completion and CMS request
    pub request_timeout_secs: u64,
    /// Per-site keyword lists for the topic router; empty disables routing
    pub sites: Vec<SiteConfig>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let sites = match env::var("SITES_JSON") {
            Ok(raw) => serde_json::from_str(&raw).context("SITES_JSON must be a JSON array of site configs")?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            openai_api_key: env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set")?,
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            wordpress_url: env::var("WORDPRESS_URL")
                .context("WORDPRESS_URL must be set")?,
            wordpress_username: env::var("WORDPRESS_USERNAME")
                .context("WORDPRESS_USERNAME must be set")?,
            wordpress_app_password: env::var("WORDPRESS_APP_PASSWORD")
                .context("WORDPRESS_APP_PASSWORD must be set")?,
            poll_interval_secs: env_u64("WORKER_POLL_INTERVAL_SECS", 15)?,
            processing_timeout_secs: env_u64("PROCESSING_TIMEOUT_SECS", 600)?,
            sweep_interval_secs: env_u64("SWEEP_INTERVAL_SECS", 60)?,
            request_timeout_secs: env_u64("REQUEST_TIMEOUT_SECS", 60)?,
            sites,
        })
    }
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{name} must be a valid number")),
        Err(_) => Ok(default),
    }
}
