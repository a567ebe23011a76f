//! Staleness sweeper.
//!
//! A worker that crashes between claim and release leaves its job stuck in
//! `Processing`. The sweeper periodically returns such jobs to the queue,
//! charging a retry each time, so no job is stranded forever.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::store::JobStore;

pub struct Sweeper<S: JobStore> {
    store: Arc<S>,
    /// How often to look for stale jobs
    interval: Duration,
    /// Age past which a processing job counts as abandoned
    processing_timeout: Duration,
}

impl<S: JobStore + 'static> Sweeper<S> {
    pub fn new(store: Arc<S>, interval: Duration, processing_timeout: Duration) -> Self {
        Self {
            store,
            interval,
            processing_timeout,
        }
    }

    /// Run until the token cancels.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        info!(
            interval_secs = self.interval.as_secs(),
            timeout_secs = self.processing_timeout.as_secs(),
            "staleness sweeper starting"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            match self.store.sweep_stale(self.processing_timeout).await {
                Ok(0) => {}
                Ok(count) => warn!(count, "reclaimed stale processing jobs"),
                Err(e) => error!(error = %e, "staleness sweep failed"),
            }
        }

        info!("staleness sweeper stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::memory::MemoryJobStore;
    use crate::jobs::{JobStatus, JobUpdate, NewJob};
    use chrono::Utc;

    #[tokio::test]
    async fn sweeper_loop_reclaims_backdated_claims() {
        let store = Arc::new(MemoryJobStore::new());
        let job = store.create(NewJob::new("stuck")).await.unwrap();
        store.claim_next().await.unwrap().unwrap();
        store
            .update(
                job.id,
                JobUpdate::new().claimed_at(Some(Utc::now() - chrono::Duration::hours(1))),
            )
            .await
            .unwrap();

        let sweeper = Sweeper::new(
            Arc::clone(&store),
            Duration::from_millis(10),
            Duration::from_secs(60),
        );

        let token = CancellationToken::new();
        let handle = tokio::spawn(sweeper.run(token.clone()));

        // Give the sweeper a couple of ticks, then stop it
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        handle.await.unwrap().unwrap();

        let reclaimed = store.get(job.id).await.unwrap();
        assert_eq!(reclaimed.status, JobStatus::Pending);
        assert_eq!(reclaimed.retry_count, 1);
    }
}
