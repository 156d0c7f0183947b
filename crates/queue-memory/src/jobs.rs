use async_trait::async_trait;
use chrono::{DateTime, Utc};
use queue_core::{JobRecord, JobStorage};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::MemoryStorageError;

/// In-process `JobStorage` backed by a `Vec` guarded by a single
/// mutex. Filtering for `get_next_batch` happens in memory, exactly as
/// the storage contract allows.
#[derive(Default)]
pub struct MemoryJobStorage {
    jobs: Mutex<Vec<JobRecord>>,
}

impl MemoryJobStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStorage for MemoryJobStorage {
    type Error = MemoryStorageError;

    async fn store_job(&self, record: &JobRecord) -> Result<(), Self::Error> {
        self.jobs.lock().await.push(record.clone());
        Ok(())
    }

    async fn get_next_batch(
        &self,
        queue_id: u128,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>, Self::Error> {
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .iter()
            .filter(|job| {
                job.queue_id == queue_id
                    && !job.is_complete
                    && now >= job.execute_after
                    && now <= job.expire_on
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_job_complete(&self, tracking_id: Uuid) -> Result<(), Self::Error> {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.iter_mut().find(|j| j.tracking_id == tracking_id) {
            job.is_complete = true;
        }
        Ok(())
    }

    async fn cancel_job(&self, tracking_id: Uuid) -> Result<(), Self::Error> {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.iter_mut().find(|j| j.tracking_id == tracking_id) {
            job.is_complete = true;
        }
        Ok(())
    }

    async fn on_handler_execution_failure(
        &self,
        tracking_id: Uuid,
        error: &str,
    ) -> Result<(), Self::Error> {
        tracing::debug!(%tracking_id, error, "job execution failed, leaving record pending for redispatch");
        Ok(())
    }
}
