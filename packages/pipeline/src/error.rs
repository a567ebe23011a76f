//! Pipeline error taxonomy.
//!
//! Four failure families matter to callers:
//! - [`PipelineError::Validation`] and [`PipelineError::Constraint`] are
//!   caller bugs. They propagate directly and are never retried.
//! - [`PipelineError::Generation`] and [`PipelineError::Publish`] are
//!   external-service failures. The worker translates them into a failure
//!   release, which feeds the job's retry budget.
//!
//! An empty queue is not an error: `claim_next` returns `Ok(None)`.

use completion_client::CompletionError;
use thiserror::Error;
use uuid::Uuid;
use wordpress_client::WordPressError;

use crate::retry::Retryable;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed input to a job store write (bad topic, unknown fields)
    #[error("validation error: {0}")]
    Validation(String),

    /// A write would leave a job violating a state-machine invariant
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Unknown job id
    #[error("job not found: {0}")]
    NotFound(Uuid),

    /// Completion API failure or timeout
    #[error("content generation failed: {0}")]
    Generation(#[from] CompletionError),

    /// CMS API failure; carries the HTTP status and body when available
    #[error("publish failed: {0}")]
    Publish(#[from] WordPressError),

    /// Storage-layer failure
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl Retryable for PipelineError {
    fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Generation(e) => e.is_transient(),
            PipelineError::Publish(e) => e.is_transient(),
            PipelineError::Validation(_)
            | PipelineError::Constraint(_)
            | PipelineError::NotFound(_)
            | PipelineError::Database(_) => false,
        }
    }
}
