//! Pipeline worker: claim → route → generate → publish → release.
//!
//! The worker is a long-running service that polls the job store for
//! pending work. External-service failures (`Generation`, `Publish`) are
//! translated into a failure release, feeding the job's retry budget.
//! `Validation`/`Constraint` errors are caller bugs and propagate.
//!
//! Many worker instances may run against the same store; exclusivity is
//! the store's `claim_next` guarantee, not the worker's.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::job::ContentJob;
use super::store::{JobStore, JobUpdate, ReleaseOutcome};
use crate::error::PipelineError;
use crate::generator::{ArticleGenerator, GeneratedArticle};
use crate::publisher::ArticlePublisher;
use crate::router::{route, SiteConfig};

/// Configuration for the pipeline worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long to sleep when the queue is empty
    pub poll_interval: Duration,
    /// Worker ID for this instance
    pub worker_id: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            worker_id: format!("worker-{}", Uuid::new_v4()),
        }
    }
}

/// A worker that drives content jobs from claim to release.
pub struct PipelineWorker<S: JobStore> {
    store: Arc<S>,
    generator: Arc<dyn ArticleGenerator>,
    publisher: Arc<dyn ArticlePublisher>,
    sites: Vec<SiteConfig>,
    config: WorkerConfig,
}

impl<S: JobStore + 'static> PipelineWorker<S> {
    pub fn new(
        store: Arc<S>,
        generator: Arc<dyn ArticleGenerator>,
        publisher: Arc<dyn ArticlePublisher>,
        sites: Vec<SiteConfig>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            generator,
            publisher,
            sites,
            config,
        }
    }

    /// Run until the token cancels. Claim errors back off and retry; job
    /// failures are released against the job's retry budget.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        info!(worker_id = %self.config.worker_id, "pipeline worker starting");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.store.claim_next().await {
                Ok(Some(job)) => {
                    let job_id = job.id;
                    if let Err(e) = self.process_job(job).await {
                        error!(job_id = %job_id, error = %e, "job processing failed");
                    }
                }
                Ok(None) => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                    }
                }
                Err(e) => {
                    error!(error = %e, "failed to claim job");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    }
                }
            }
        }

        info!(worker_id = %self.config.worker_id, "pipeline worker stopped");
        Ok(())
    }

    /// Process one claimed job through generate and publish.
    async fn process_job(&self, job: ContentJob) -> Result<(), PipelineError> {
        info!(job_id = %job.id, topic = %job.topic, retry_count = job.retry_count, "processing job");

        let job = self.resolve_target_site(job).await?;
        let categories = self.categories_for(job.target_site.as_deref());

        // A failed publish caches its generated content on the job; reuse it
        // instead of paying for generation again.
        let article = match (&job.generated_title, &job.generated_content) {
            (Some(title), Some(content)) => {
                debug!(job_id = %job.id, "reusing cached generated content");
                GeneratedArticle {
                    title: title.clone(),
                    content: content.clone(),
                    excerpt: job.generated_excerpt.clone().unwrap_or_default(),
                }
            }
            _ => match self.generator.generate(&job.topic).await {
                Ok(article) => article,
                Err(e @ PipelineError::Generation(_)) => {
                    warn!(job_id = %job.id, error = %e, "generation failed");
                    self.store
                        .release(
                            job.id,
                            ReleaseOutcome::Failure {
                                error: e.to_string(),
                                article: None,
                            },
                        )
                        .await?;
                    return Ok(());
                }
                Err(e) => return Err(e),
            },
        };

        match self.publisher.publish(&article, &categories).await {
            Ok(post) => {
                let released = self
                    .store
                    .release(job.id, ReleaseOutcome::Success { article, post })
                    .await?;
                info!(
                    job_id = %released.id,
                    post_id = released.published_post_id.as_deref().unwrap_or(""),
                    "job completed"
                );
            }
            Err(e @ PipelineError::Publish(_)) => {
                warn!(job_id = %job.id, error = %e, "publish failed");
                self.store
                    .release(
                        job.id,
                        ReleaseOutcome::Failure {
                            error: e.to_string(),
                            article: Some(article),
                        },
                    )
                    .await?;
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }

    /// Route the topic when no site is pinned yet, recording the decision
    /// on the job.
    async fn resolve_target_site(&self, job: ContentJob) -> Result<ContentJob, PipelineError> {
        if job.target_site.is_some() || self.sites.is_empty() {
            return Ok(job);
        }

        match route(&job.topic, &self.sites) {
            Some(site) => {
                debug!(job_id = %job.id, site = %site.name, "topic routed");
                self.store
                    .update(
                        job.id,
                        JobUpdate::new().target_site(Some(site.name.clone())),
                    )
                    .await
            }
            None => Ok(job),
        }
    }

    fn categories_for(&self, target_site: Option<&str>) -> Vec<u32> {
        target_site
            .and_then(|name| self.sites.iter().find(|s| s.name == name))
            .map(|s| s.category_ids.clone())
            .unwrap_or_default()
    }
}
