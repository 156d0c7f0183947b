//! Persistent, per-command-type job queue runtime with a companion
//! durable event subscriber pipeline.
//!
//! A producer hands a typed [`Command`] to [`enqueue`]; the record is
//! persisted through a pluggable [`JobStorage`] provider, and the
//! matching [`JobQueue`]'s background drain task picks it up, runs it
//! with bounded concurrency and a per-item deadline, and marks it
//! complete (or reports the failure) against the same store. The
//! companion [`subscriber`] pipeline does the analogous thing for a
//! long-lived stream of external events: a producer task drains the
//! transport into an [`EventStorage`] provider, a consumer task polls
//! that store and dispatches to a handler.
//!
//! This crate never speaks to a concrete database or transport itself;
//! [`queue-memory`](https://docs.rs/queue-memory) and
//! [`queue-postgres`](https://docs.rs/queue-postgres) supply those.

mod cancellation;
mod command;
mod config;
mod error;
mod event;
mod hash;
mod metrics;
mod queue;
mod record;
mod registry;
mod retry;
mod storage;
pub mod subscriber;
mod transport;

pub use cancellation::CancellationRegistry;
pub use command::Command;
pub use config::QueueConfig;
pub use error::{ExecutionError, FacadeError, QueueError, TransportError};
pub use event::{Event, EventHandler, EventHandlerFactory};
pub use hash::{queue_id_for, subscriber_id};
pub use queue::{JobQueue, QueueHandle};
pub use record::{EventRecord, JobRecord};
pub use registry::QueueRegistry;
pub use storage::{EventStorage, JobStorage};
pub use subscriber::SubscriberHandle;
pub use transport::{EventStream, EventTransport};

use uuid::Uuid;

/// Per-job opaque identifier returned from [`enqueue`], used to key
/// cancellation.
pub type TrackingId = Uuid;

/// Enqueues `command` onto whichever [`JobQueue`] is registered for
/// its concrete type in `registry`.
///
/// Mirrors the split between a typed queue instance and a
/// type-erased façade described in the queue registry design: callers
/// never hold a `JobQueue<C, S>` directly, only the shared registry.
pub async fn enqueue<C: Command>(
    registry: &QueueRegistry,
    command: &C,
    execute_after: Option<chrono::DateTime<chrono::Utc>>,
    expire_on: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<TrackingId, FacadeError> {
    let handle = registry
        .get::<C>()
        .await
        .ok_or(FacadeError::NoQueueRegistered)?;
    let value = serde_json::to_value(command).map_err(QueueError::Serialization)?;
    handle
        .store_job_dyn(value, execute_after, expire_on)
        .await
        .map_err(FacadeError::from)
}

/// Cancels the job tracked as `tracking_id` on whichever queue is
/// registered for command type `C`.
pub async fn cancel<C: Command>(
    registry: &QueueRegistry,
    tracking_id: TrackingId,
) -> Result<(), FacadeError> {
    let handle = registry
        .get::<C>()
        .await
        .ok_or(FacadeError::NoQueueRegistered)?;
    handle.cancel_job(tracking_id).await.map_err(FacadeError::from)
}
