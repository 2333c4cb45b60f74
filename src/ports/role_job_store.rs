//! RoleJobStore port - Durable queue of role jobs.
//!
//! The ingestion endpoint appends; the downstream role worker reads pending
//! jobs and marks them done. Nothing else touches job records.
//!
//! ## Idempotency
//!
//! Stripe may deliver the same event more than once. Jobs carry the
//! originating event id, and implementations must make re-enqueueing a seen
//! id a no-op that returns the job recorded the first time.

use async_trait::async_trait;

use crate::domain::foundation::RoleJobId;
use crate::domain::role_job::{NewRoleJob, RoleJob};

/// Errors that can occur during job store operations.
#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("Role job not found: {0}")]
    NotFound(RoleJobId),

    #[error("Job store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt role job record: {0}")]
    Corrupt(String),
}

impl JobStoreError {
    /// Returns true if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, JobStoreError::Unavailable(_))
    }
}

/// Result of attempting to enqueue a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueResult {
    /// A new job was recorded.
    Created(RoleJob),
    /// A job for the same event id already exists; nothing was written.
    Duplicate(RoleJob),
}

impl EnqueueResult {
    /// The job now on record, new or prior.
    pub fn job(&self) -> &RoleJob {
        match self {
            EnqueueResult::Created(job) | EnqueueResult::Duplicate(job) => job,
        }
    }

    /// Consumes the result, returning the job on record.
    pub fn into_job(self) -> RoleJob {
        match self {
            EnqueueResult::Created(job) | EnqueueResult::Duplicate(job) => job,
        }
    }

    /// Returns true if this call wrote the job.
    pub fn is_created(&self) -> bool {
        matches!(self, EnqueueResult::Created(_))
    }
}

/// Port for the durable role job queue.
///
/// Implementations must be safe under concurrent callers. Each `enqueue` is
/// atomic: once it returns, the job survives a restart, and a reader never
/// observes a partially written job.
#[async_trait]
pub trait RoleJobStore: Send + Sync {
    /// Append a new pending job.
    ///
    /// Assigns `id` and `created_at`. When `job.event_id` was seen before,
    /// returns `EnqueueResult::Duplicate` with the prior job.
    async fn enqueue(&self, job: NewRoleJob) -> Result<EnqueueResult, JobStoreError>;

    /// Mark a job as done.
    ///
    /// Idempotent: marking a done job again is a no-op.
    ///
    /// # Errors
    /// `JobStoreError::NotFound` if no job has this id.
    async fn mark_done(&self, id: RoleJobId) -> Result<(), JobStoreError>;

    /// All jobs not yet done, oldest first.
    async fn list_pending(&self) -> Result<Vec<RoleJob>, JobStoreError>;

    /// Find the job recorded for a Stripe event, if any.
    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<RoleJob>, JobStoreError>;
}
