//! Job store trait: durable record of jobs plus the claim/release/sweep
//! operations that drive the state machine.
//!
//! Two implementations exist: [`PostgresJobStore`](super::PostgresJobStore)
//! for production and [`MemoryJobStore`](super::MemoryJobStore) for tests.
//! Both enforce the same invariants, so state-machine tests written against
//! the in-memory store describe the database-backed behavior too.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::job::ContentJob;
use super::JobStatus;
use crate::error::Result;
use crate::generator::GeneratedArticle;
use crate::publisher::PublishedPost;

/// Message recorded on jobs reclaimed by the staleness sweep.
pub(crate) const STALE_SWEEP_ERROR: &str = "processing timed out without release";

/// Input for creating a job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub topic: String,
    pub target_site: Option<String>,
}

impl NewJob {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            target_site: None,
        }
    }

    /// Pin the job to a site, bypassing the router.
    pub fn target_site(mut self, site: impl Into<String>) -> Self {
        self.target_site = Some(site.into());
        self
    }
}

/// Read-only query filter for `list`.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl JobFilter {
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Partial update for `update`. Outer `None` leaves a field untouched;
/// `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub retry_count: Option<i32>,
    pub claimed_at: Option<Option<DateTime<Utc>>>,
    pub generated_title: Option<Option<String>>,
    pub generated_content: Option<Option<String>>,
    pub generated_excerpt: Option<Option<String>>,
    pub published_post_id: Option<Option<String>>,
    pub published_url: Option<Option<String>>,
    pub target_site: Option<Option<String>>,
    pub last_error: Option<Option<String>>,
}

impl JobUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn retry_count(mut self, retry_count: i32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }

    pub fn claimed_at(mut self, claimed_at: Option<DateTime<Utc>>) -> Self {
        self.claimed_at = Some(claimed_at);
        self
    }

    pub fn generated_title(mut self, title: Option<String>) -> Self {
        self.generated_title = Some(title);
        self
    }

    pub fn generated_content(mut self, content: Option<String>) -> Self {
        self.generated_content = Some(content);
        self
    }

    pub fn generated_excerpt(mut self, excerpt: Option<String>) -> Self {
        self.generated_excerpt = Some(excerpt);
        self
    }

    pub fn published_post_id(mut self, post_id: Option<String>) -> Self {
        self.published_post_id = Some(post_id);
        self
    }

    pub fn published_url(mut self, url: Option<String>) -> Self {
        self.published_url = Some(url);
        self
    }

    pub fn target_site(mut self, site: Option<String>) -> Self {
        self.target_site = Some(site);
        self
    }

    pub fn last_error(mut self, error: Option<String>) -> Self {
        self.last_error = Some(error);
        self
    }

    /// Apply this patch to a job in place. Timestamps are the caller's job.
    pub fn apply(&self, job: &mut ContentJob) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(retry_count) = self.retry_count {
            job.retry_count = retry_count;
        }
        if let Some(claimed_at) = self.claimed_at {
            job.claimed_at = claimed_at;
        }
        if let Some(ref title) = self.generated_title {
            job.generated_title = title.clone();
        }
        if let Some(ref content) = self.generated_content {
            job.generated_content = content.clone();
        }
        if let Some(ref excerpt) = self.generated_excerpt {
            job.generated_excerpt = excerpt.clone();
        }
        if let Some(ref post_id) = self.published_post_id {
            job.published_post_id = post_id.clone();
        }
        if let Some(ref url) = self.published_url {
            job.published_url = url.clone();
        }
        if let Some(ref site) = self.target_site {
            job.target_site = site.clone();
        }
        if let Some(ref error) = self.last_error {
            job.last_error = error.clone();
        }
    }
}

/// How a claimed job ended.
#[derive(Debug, Clone)]
pub enum ReleaseOutcome {
    /// Generation and publish both succeeded.
    Success {
        article: GeneratedArticle,
        post: PublishedPost,
    },
    /// The attempt failed. When generation succeeded but publish did not,
    /// `article` carries the generated content so the next attempt can skip
    /// the generation call.
    Failure {
        error: String,
        article: Option<GeneratedArticle>,
    },
}

/// Durable, queryable record of content jobs.
///
/// Every status-changing write is conditional on the job's current status,
/// so two concurrent workers can never both move the same job.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a job in `Pending`. Fails with `Validation` for a blank or
    /// oversized topic.
    async fn create(&self, new_job: NewJob) -> Result<ContentJob>;

    /// Fetch one job. Fails with `NotFound` for an unknown id.
    async fn get(&self, id: Uuid) -> Result<ContentJob>;

    /// Query jobs, oldest first. Read-only.
    async fn list(&self, filter: JobFilter) -> Result<Vec<ContentJob>>;

    /// Partial update. Fails with `Constraint` if the resulting row would
    /// violate an invariant, or if the job was concurrently modified.
    async fn update(&self, id: Uuid, update: JobUpdate) -> Result<ContentJob>;

    /// Atomically claim the oldest pending job (tie-break by id): sets
    /// `Processing` and stamps `claimed_at`. Returns `None` when the queue
    /// is empty. Exactly one concurrent caller can win a given job.
    async fn claim_next(&self) -> Result<Option<ContentJob>>;

    /// Finish a claimed job. Success moves it to `Completed` with all result
    /// fields; failure increments `retry_count` and requeues to `Pending`,
    /// or moves to terminal `Error` once the budget is spent. Rejected with
    /// `Constraint` unless the job is currently `Processing`; releasing an
    /// already-completed job is a bug, not a no-op.
    async fn release(&self, id: Uuid, outcome: ReleaseOutcome) -> Result<ContentJob>;

    /// Requeue jobs stuck in `Processing` longer than `timeout`, charging a
    /// retry each; jobs with no budget left go to terminal `Error`. Returns
    /// the number of jobs swept.
    async fn sweep_stale(&self, timeout: Duration) -> Result<u64>;
}
