//! Content job model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::error::{PipelineError, Result};

/// Retry budget: a job that has already been retried this many times fails
/// terminally on the next failure.
pub const MAX_RETRIES: i32 = 3;

/// Maximum topic length accepted at creation.
pub const MAX_TOPIC_LEN: usize = 500;

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "content_job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Error,
}

// ============================================================================
// Job Model
// ============================================================================

/// One unit of topic → published-article work.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct ContentJob {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    pub topic: String,

    #[builder(default)]
    pub status: JobStatus,

    #[builder(default = 0)]
    pub retry_count: i32,

    /// Set exactly while a worker holds the job in `Processing`
    #[builder(default, setter(strip_option))]
    pub claimed_at: Option<DateTime<Utc>>,

    // Generation output. Present at completion; may also be present on a
    // pending job when a failed publish cached its generated content.
    #[builder(default, setter(strip_option))]
    pub generated_title: Option<String>,
    #[builder(default, setter(strip_option))]
    pub generated_content: Option<String>,
    #[builder(default, setter(strip_option))]
    pub generated_excerpt: Option<String>,

    // Publish output
    #[builder(default, setter(strip_option))]
    pub published_post_id: Option<String>,
    #[builder(default, setter(strip_option))]
    pub published_url: Option<String>,

    // Routing
    #[builder(default, setter(strip_option))]
    pub target_site: Option<String>,

    /// Diagnostics, populated exactly on terminal failure
    #[builder(default, setter(strip_option))]
    pub last_error: Option<String>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl ContentJob {
    /// Create a new pending job for a validated topic.
    pub fn new(topic: impl Into<String>) -> Result<Self> {
        let topic = validate_topic(topic.into())?;
        Ok(Self::builder().topic(topic).build())
    }

    /// Whether this job still has retry budget left.
    pub fn can_retry(&self) -> bool {
        self.retry_count < MAX_RETRIES
    }

    /// Check every state-machine invariant, returning the first violation.
    ///
    /// The Postgres store also enforces these as CHECK constraints; keeping
    /// the same checks here means the in-memory store rejects exactly the
    /// writes the database would.
    pub fn check_invariants(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(PipelineError::Constraint("topic must not be blank".into()));
        }
        if !(0..=MAX_RETRIES).contains(&self.retry_count) {
            return Err(PipelineError::Constraint(format!(
                "retry_count {} outside [0, {MAX_RETRIES}]",
                self.retry_count
            )));
        }
        match self.status {
            JobStatus::Processing if self.claimed_at.is_none() => {
                return Err(PipelineError::Constraint(
                    "processing job must have claimed_at set".into(),
                ));
            }
            JobStatus::Pending | JobStatus::Completed | JobStatus::Error
                if self.claimed_at.is_some() =>
            {
                return Err(PipelineError::Constraint(format!(
                    "claimed_at must be cleared outside processing (status: {:?})",
                    self.status
                )));
            }
            _ => {}
        }
        if self.status == JobStatus::Completed
            && (self.generated_title.is_none()
                || self.generated_content.is_none()
                || self.published_post_id.is_none())
        {
            return Err(PipelineError::Constraint(
                "completed job requires generated_title, generated_content, published_post_id"
                    .into(),
            ));
        }
        if (self.status == JobStatus::Error) != self.last_error.is_some() {
            return Err(PipelineError::Constraint(
                "last_error must be set exactly when status is error".into(),
            ));
        }
        Ok(())
    }
}

/// Validate and normalize a topic string.
pub fn validate_topic(topic: String) -> Result<String> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::Validation(
            "topic must not be empty or whitespace".into(),
        ));
    }
    if trimmed.chars().count() > MAX_TOPIC_LEN {
        return Err(PipelineError::Validation(format!(
            "topic exceeds {MAX_TOPIC_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_pending_with_zero_retries() {
        let job = ContentJob::new("Test Topic").unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retry_count, 0);
        assert!(job.claimed_at.is_none());
        assert!(job.check_invariants().is_ok());
    }

    #[test]
    fn topic_is_trimmed_on_creation() {
        let job = ContentJob::new("  Rust Memory Safety  ").unwrap();
        assert_eq!(job.topic, "Rust Memory Safety");
    }

    #[test]
    fn blank_topic_is_rejected() {
        assert!(matches!(
            ContentJob::new("   "),
            Err(PipelineError::Validation(_))
        ));
        assert!(matches!(
            ContentJob::new(""),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn oversized_topic_is_rejected() {
        let topic = "x".repeat(MAX_TOPIC_LEN + 1);
        assert!(matches!(
            ContentJob::new(topic),
            Err(PipelineError::Validation(_))
        ));

        let topic = "x".repeat(MAX_TOPIC_LEN);
        assert!(ContentJob::new(topic).is_ok());
    }

    #[test]
    fn processing_without_claimed_at_violates_invariants() {
        let mut job = ContentJob::new("t").unwrap();
        job.status = JobStatus::Processing;
        assert!(matches!(
            job.check_invariants(),
            Err(PipelineError::Constraint(_))
        ));

        job.claimed_at = Some(Utc::now());
        assert!(job.check_invariants().is_ok());
    }

    #[test]
    fn pending_with_claimed_at_violates_invariants() {
        let mut job = ContentJob::new("t").unwrap();
        job.claimed_at = Some(Utc::now());
        assert!(job.check_invariants().is_err());
    }

    #[test]
    fn completed_requires_all_result_fields() {
        let mut job = ContentJob::new("t").unwrap();
        job.status = JobStatus::Completed;
        assert!(job.check_invariants().is_err());

        job.generated_title = Some("T".into());
        job.generated_content = Some("C".into());
        assert!(job.check_invariants().is_err());

        job.published_post_id = Some("123".into());
        assert!(job.check_invariants().is_ok());
    }

    #[test]
    fn error_status_and_last_error_are_tied_together() {
        let mut job = ContentJob::new("t").unwrap();
        job.status = JobStatus::Error;
        assert!(job.check_invariants().is_err());

        job.last_error = Some("boom".into());
        assert!(job.check_invariants().is_ok());

        job.status = JobStatus::Pending;
        assert!(job.check_invariants().is_err());
    }

    #[test]
    fn retry_count_bounds_are_enforced() {
        let mut job = ContentJob::new("t").unwrap();
        job.retry_count = MAX_RETRIES;
        assert!(job.check_invariants().is_ok());
        assert!(!job.can_retry());

        job.retry_count = MAX_RETRIES + 1;
        assert!(job.check_invariants().is_err());

        job.retry_count = -1;
        assert!(job.check_invariants().is_err());
    }
}
