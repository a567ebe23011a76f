//! In-memory job store.
//!
//! Used by tests and local development. Runs the same validation path as
//! the Postgres store; the interior mutex makes `claim_next` atomic, so the
//! exclusivity guarantee holds here too.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::job::{validate_topic, ContentJob, JobStatus};
use super::store::{
    JobFilter, JobStore, JobUpdate, NewJob, ReleaseOutcome, STALE_SWEEP_ERROR,
};
use crate::error::{PipelineError, Result};

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, ContentJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, ContentJob>> {
        self.jobs.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, ContentJob>> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot every stored job, unordered.
    pub fn all(&self) -> Vec<ContentJob> {
        self.read().values().cloned().collect()
    }
}

/// Apply a failure to a claimed job: requeue while retry budget remains,
/// otherwise record terminal failure. Shared by `release` and `sweep_stale`.
fn fail_job(job: &mut ContentJob, error: &str) {
    job.claimed_at = None;
    if job.can_retry() {
        job.retry_count += 1;
        job.status = JobStatus::Pending;
        job.last_error = None;
    } else {
        job.status = JobStatus::Error;
        job.last_error = Some(error.to_string());
    }
    job.updated_at = Utc::now();
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, new_job: NewJob) -> Result<ContentJob> {
        let topic = validate_topic(new_job.topic)?;
        let mut job = ContentJob::builder().topic(topic).build();
        job.target_site = new_job.target_site;
        job.check_invariants()?;

        self.write().insert(job.id, job.clone());
        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<ContentJob> {
        self.read()
            .get(&id)
            .cloned()
            .ok_or(PipelineError::NotFound(id))
    }

    async fn list(&self, filter: JobFilter) -> Result<Vec<ContentJob>> {
        let mut jobs: Vec<ContentJob> = self
            .read()
            .values()
            .filter(|j| filter.status.map_or(true, |s| j.status == s))
            .filter(|j| filter.created_after.map_or(true, |t| j.created_at >= t))
            .filter(|j| filter.created_before.map_or(true, |t| j.created_at <= t))
            .cloned()
            .collect();

        jobs.sort_by_key(|j| (j.created_at, j.id));
        if let Some(limit) = filter.limit {
            jobs.truncate(limit.max(0) as usize);
        }
        Ok(jobs)
    }

    async fn update(&self, id: Uuid, update: JobUpdate) -> Result<ContentJob> {
        let mut jobs = self.write();
        let job = jobs.get(&id).ok_or(PipelineError::NotFound(id))?;

        let mut updated = job.clone();
        update.apply(&mut updated);
        updated.updated_at = Utc::now();
        updated.check_invariants()?;

        jobs.insert(id, updated.clone());
        Ok(updated)
    }

    async fn claim_next(&self) -> Result<Option<ContentJob>> {
        let mut jobs = self.write();

        let next_id = jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending)
            .min_by_key(|j| (j.created_at, j.id))
            .map(|j| j.id);

        let Some(id) = next_id else {
            return Ok(None);
        };

        // Single write lock makes select-and-transition atomic
        let job = jobs
            .get_mut(&id)
            .ok_or(PipelineError::NotFound(id))?;
        job.status = JobStatus::Processing;
        job.claimed_at = Some(Utc::now());
        job.updated_at = Utc::now();

        Ok(Some(job.clone()))
    }

    async fn release(&self, id: Uuid, outcome: ReleaseOutcome) -> Result<ContentJob> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&id).ok_or(PipelineError::NotFound(id))?;

        if job.status != JobStatus::Processing {
            return Err(PipelineError::Constraint(format!(
                "cannot release job {id} in status {:?}; only processing jobs release",
                job.status
            )));
        }

        match outcome {
            ReleaseOutcome::Success { article, post } => {
                job.status = JobStatus::Completed;
                job.claimed_at = None;
                job.generated_title = Some(article.title);
                job.generated_content = Some(article.content);
                job.generated_excerpt = Some(article.excerpt);
                job.published_post_id = Some(post.post_id);
                job.published_url = Some(post.url);
                job.last_error = None;
                job.updated_at = Utc::now();
            }
            ReleaseOutcome::Failure { error, article } => {
                if let Some(article) = article {
                    job.generated_title = Some(article.title);
                    job.generated_content = Some(article.content);
                    job.generated_excerpt = Some(article.excerpt);
                }
                fail_job(job, &error);
            }
        }

        job.check_invariants()?;
        Ok(job.clone())
    }

    async fn sweep_stale(&self, timeout: Duration) -> Result<u64> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(timeout)
                .map_err(|e| PipelineError::Validation(format!("timeout out of range: {e}")))?;

        let mut swept = 0u64;
        for job in self.write().values_mut() {
            if job.status == JobStatus::Processing
                && job.claimed_at.is_some_and(|t| t < cutoff)
            {
                fail_job(job, STALE_SWEEP_ERROR);
                swept += 1;
            }
        }
        Ok(swept)
    }
}
