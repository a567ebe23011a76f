//! Job infrastructure: the content-job state machine and the services that
//! drive it.
//!
//! - [`ContentJob`] - job model with invariant checks
//! - [`JobStore`] - store trait: create/get/list/update plus the atomic
//!   claim, release, and staleness-sweep operations
//! - [`PostgresJobStore`] / [`MemoryJobStore`] - production and test stores
//! - [`PipelineWorker`] - long-running claim → generate → publish loop
//! - [`Sweeper`] - periodic recovery of abandoned `Processing` jobs
//!
//! # Lifecycle
//!
//! ```text
//! create ──► pending ──claim──► processing ──release(success)──► completed
//!               ▲                   │
//!               │                   ├─release(failure), budget left
//!               └───────────────────┤        (retry_count + 1)
//!                                   └─release(failure) or sweep, budget spent
//!                                            ──► error (terminal)
//! ```

mod job;
pub mod memory;
mod postgres;
mod store;
mod sweeper;
mod worker;

pub use job::{ContentJob, JobStatus, MAX_RETRIES, MAX_TOPIC_LEN};
pub use memory::MemoryJobStore;
pub use postgres::PostgresJobStore;
pub use store::{JobFilter, JobStore, JobUpdate, NewJob, ReleaseOutcome};
pub use sweeper::Sweeper;
pub use worker::{PipelineWorker, WorkerConfig};
