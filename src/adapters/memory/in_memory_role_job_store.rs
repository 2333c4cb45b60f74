//! In-Memory RoleJobStore Adapter
//!
//! Keeps role jobs in a vector guarded by a tokio `RwLock`.
//! Useful for testing and local development.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{RoleJobId, Timestamp};
use crate::domain::role_job::{NewRoleJob, RoleJob};
use crate::ports::{EnqueueResult, JobStoreError, RoleJobStore};

/// In-memory role job queue
#[derive(Debug, Clone)]
pub struct InMemoryRoleJobStore {
    jobs: Arc<RwLock<Vec<RoleJob>>>,
}

impl InMemoryRoleJobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Every job ever enqueued, done or not, in creation order
    pub async fn all_jobs(&self) -> Vec<RoleJob> {
        self.jobs.read().await.clone()
    }

    /// Number of stored jobs
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Returns true if nothing has been enqueued
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

impl Default for InMemoryRoleJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleJobStore for InMemoryRoleJobStore {
    async fn enqueue(&self, job: NewRoleJob) -> Result<EnqueueResult, JobStoreError> {
        // Single write guard covers the duplicate check and the append
        let mut jobs = self.jobs.write().await;

        if let Some(event_id) = job.event_id.as_deref() {
            if let Some(prior) = jobs.iter().find(|j| j.event_id.as_deref() == Some(event_id)) {
                return Ok(EnqueueResult::Duplicate(prior.clone()));
            }
        }

        let next_id = jobs.last().map_or(1, |j| j.id.as_i64() + 1);
        let created = RoleJob::from_new(RoleJobId::from_i64(next_id), job, Timestamp::now());
        jobs.push(created.clone());

        Ok(EnqueueResult::Created(created))
    }

    async fn mark_done(&self, id: RoleJobId) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(JobStoreError::NotFound(id))?;
        job.done = true;
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<RoleJob>, JobStoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.iter().filter(|j| j.is_pending()).cloned().collect())
    }

    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<RoleJob>, JobStoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs
            .iter()
            .find(|j| j.event_id.as_deref() == Some(event_id))
            .cloned())
    }
}
