use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::record::{EventRecord, JobRecord};

/// Durable storage backing a single command queue.
///
/// A queue's `queue_id` partitions records so a single storage
/// provider (a table, a collection) can back every command type at
/// once.
#[async_trait]
pub trait JobStorage: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn store_job(&self, record: &JobRecord) -> Result<(), Self::Error>;

    /// Fetch up to `limit` unexpired, incomplete, due records for
    /// `queue_id`. Order is backend-defined; the core places no
    /// ordering requirement on it.
    async fn get_next_batch(
        &self,
        queue_id: u128,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>, Self::Error>;

    async fn mark_job_complete(&self, tracking_id: Uuid) -> Result<(), Self::Error>;

    async fn cancel_job(&self, tracking_id: Uuid) -> Result<(), Self::Error>;

    /// Called when a command's `execute` returns an error, or when its
    /// payload fails to deserialize. `error` is a human-readable
    /// description; storage is not expected to parse it.
    async fn on_handler_execution_failure(
        &self,
        tracking_id: Uuid,
        error: &str,
    ) -> Result<(), Self::Error>;
}

/// Durable storage backing the event subscriber pipeline.
#[async_trait]
pub trait EventStorage: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn store_event(&self, record: &EventRecord) -> Result<(), Self::Error>;

    /// Fetch the next unexpired, incomplete event for `subscriber_id`,
    /// if any.
    async fn get_next_event(
        &self,
        subscriber_id: u128,
    ) -> Result<Option<EventRecord>, Self::Error>;

    async fn mark_event_complete(&self, id: Uuid) -> Result<(), Self::Error>;
}
