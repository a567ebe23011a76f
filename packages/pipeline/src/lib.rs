// Content Pipeline - Core
//
// Database-backed content generation: jobs move pending → processing →
// completed/error under an atomic claim, an LLM drafts the article, and the
// result is published to WordPress.

pub mod config;
pub mod error;
pub mod generator;
pub mod jobs;
pub mod publisher;
pub mod retry;
pub mod router;

pub use config::Config;
pub use error::{PipelineError, Result};
