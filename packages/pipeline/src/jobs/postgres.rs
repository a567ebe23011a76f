//! Postgres-backed job store.
//!
//! Claims ride a `FOR UPDATE SKIP LOCKED` CTE so concurrent workers never
//! hand out the same job twice. Every status-changing write is conditional
//! on the row still being in the expected status; the retry decision on
//! failure happens inside the UPDATE so it cannot race another release.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::job::{validate_topic, ContentJob, MAX_RETRIES};
use super::store::{
    JobFilter, JobStore, JobUpdate, NewJob, ReleaseOutcome, STALE_SWEEP_ERROR,
};
use crate::error::{PipelineError, Result};

const COLUMNS: &str = "id, topic, status, retry_count, claimed_at, \
     generated_title, generated_content, generated_excerpt, \
     published_post_id, published_url, target_site, last_error, \
     created_at, updated_at";

pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Translate CHECK-constraint rejections into the pipeline taxonomy so
    /// callers see the same `Constraint` error both stores produce.
    fn map_db_error(e: sqlx::Error) -> PipelineError {
        if let sqlx::Error::Database(ref db_err) = e {
            if let Some(constraint) = db_err.constraint() {
                if constraint.starts_with("content_jobs_") {
                    return PipelineError::Constraint(format!(
                        "database constraint {constraint} rejected the write"
                    ));
                }
            }
        }
        PipelineError::Database(e)
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn create(&self, new_job: NewJob) -> Result<ContentJob> {
        let topic = validate_topic(new_job.topic)?;

        let job = sqlx::query_as::<_, ContentJob>(&format!(
            r#"
            INSERT INTO content_jobs (id, topic, target_site)
            VALUES ($1, $2, $3)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&topic)
        .bind(&new_job.target_site)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_db_error)?;

        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<ContentJob> {
        let job = sqlx::query_as::<_, ContentJob>(&format!(
            "SELECT {COLUMNS} FROM content_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        job.ok_or(PipelineError::NotFound(id))
    }

    async fn list(&self, filter: JobFilter) -> Result<Vec<ContentJob>> {
        let jobs = sqlx::query_as::<_, ContentJob>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM content_jobs
            WHERE ($1::content_job_status IS NULL OR status = $1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at <= $3)
            ORDER BY created_at, id
            LIMIT $4
            "#
        ))
        .bind(filter.status)
        .bind(filter.created_after)
        .bind(filter.created_before)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    async fn update(&self, id: Uuid, update: JobUpdate) -> Result<ContentJob> {
        let current = self.get(id).await?;

        let mut updated = current.clone();
        update.apply(&mut updated);
        updated.check_invariants()?;

        // Optimistic concurrency: the write only lands if nobody else
        // touched the row since we read it.
        let job = sqlx::query_as::<_, ContentJob>(&format!(
            r#"
            UPDATE content_jobs SET
                status = $1, retry_count = $2, claimed_at = $3,
                generated_title = $4, generated_content = $5, generated_excerpt = $6,
                published_post_id = $7, published_url = $8, target_site = $9,
                last_error = $10, updated_at = NOW()
            WHERE id = $11 AND status = $12 AND updated_at = $13
            RETURNING {COLUMNS}
            "#
        ))
        .bind(updated.status)
        .bind(updated.retry_count)
        .bind(updated.claimed_at)
        .bind(&updated.generated_title)
        .bind(&updated.generated_content)
        .bind(&updated.generated_excerpt)
        .bind(&updated.published_post_id)
        .bind(&updated.published_url)
        .bind(&updated.target_site)
        .bind(&updated.last_error)
        .bind(id)
        .bind(current.status)
        .bind(current.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_db_error)?;

        job.ok_or_else(|| {
            PipelineError::Constraint(format!("job {id} was concurrently modified"))
        })
    }

    async fn claim_next(&self) -> Result<Option<ContentJob>> {
        let job = sqlx::query_as::<_, ContentJob>(&format!(
            r#"
            WITH next_job AS (
                SELECT id
                FROM content_jobs
                WHERE status = 'pending'
                ORDER BY created_at, id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE content_jobs
            SET status = 'processing',
                claimed_at = NOW(),
                updated_at = NOW()
            WHERE id IN (SELECT id FROM next_job)
            RETURNING {COLUMNS}
            "#
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    async fn release(&self, id: Uuid, outcome: ReleaseOutcome) -> Result<ContentJob> {
        let released = match outcome {
            ReleaseOutcome::Success { article, post } => {
                sqlx::query_as::<_, ContentJob>(&format!(
                    r#"
                    UPDATE content_jobs
                    SET status = 'completed',
                        claimed_at = NULL,
                        generated_title = $2,
                        generated_content = $3,
                        generated_excerpt = $4,
                        published_post_id = $5,
                        published_url = $6,
                        last_error = NULL,
                        updated_at = NOW()
                    WHERE id = $1 AND status = 'processing'
                    RETURNING {COLUMNS}
                    "#
                ))
                .bind(id)
                .bind(&article.title)
                .bind(&article.content)
                .bind(&article.excerpt)
                .bind(&post.post_id)
                .bind(&post.url)
                .fetch_optional(&self.pool)
                .await
                .map_err(Self::map_db_error)?
            }
            ReleaseOutcome::Failure { error, article } => {
                let (title, content, excerpt) = match article {
                    Some(a) => (Some(a.title), Some(a.content), Some(a.excerpt)),
                    None => (None, None, None),
                };

                // The retry decision reads the pre-update retry_count, so it
                // is atomic with the status transition.
                sqlx::query_as::<_, ContentJob>(&format!(
                    r#"
                    UPDATE content_jobs
                    SET claimed_at = NULL,
                        generated_title = COALESCE($3, generated_title),
                        generated_content = COALESCE($4, generated_content),
                        generated_excerpt = COALESCE($5, generated_excerpt),
                        retry_count = CASE WHEN retry_count < $6 THEN retry_count + 1 ELSE retry_count END,
                        status = CASE WHEN retry_count < $6 THEN 'pending'::content_job_status ELSE 'error'::content_job_status END,
                        last_error = CASE WHEN retry_count < $6 THEN NULL ELSE $2 END,
                        updated_at = NOW()
                    WHERE id = $1 AND status = 'processing'
                    RETURNING {COLUMNS}
                    "#
                ))
                .bind(id)
                .bind(&error)
                .bind(title)
                .bind(content)
                .bind(excerpt)
                .bind(MAX_RETRIES)
                .fetch_optional(&self.pool)
                .await
                .map_err(Self::map_db_error)?
            }
        };

        match released {
            Some(job) => Ok(job),
            // Either the job does not exist or it is not processing;
            // distinguish so callers get the right error.
            None => {
                let job = self.get(id).await?;
                Err(PipelineError::Constraint(format!(
                    "cannot release job {id} in status {:?}; only processing jobs release",
                    job.status
                )))
            }
        }
    }

    async fn sweep_stale(&self, timeout: Duration) -> Result<u64> {
        let swept = sqlx::query(
            r#"
            UPDATE content_jobs
            SET claimed_at = NULL,
                retry_count = CASE WHEN retry_count < $2 THEN retry_count + 1 ELSE retry_count END,
                status = CASE WHEN retry_count < $2 THEN 'pending'::content_job_status ELSE 'error'::content_job_status END,
                last_error = CASE WHEN retry_count < $2 THEN NULL ELSE $3 END,
                updated_at = NOW()
            WHERE status = 'processing'
              AND claimed_at < NOW() - ($1 || ' seconds')::INTERVAL
            "#,
        )
        .bind(timeout.as_secs().to_string())
        .bind(MAX_RETRIES)
        .bind(STALE_SWEEP_ERROR)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(swept)
    }
}
