//! Durable event subscriber pipeline: a producer task that drains a
//! remote transport into storage, and a consumer task that polls
//! storage and dispatches to a handler. The two are decoupled by the
//! store, so the producer can outrun the consumer without losing
//! events, bounded only by the store's own capacity.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::TransportError;
use crate::event::{Event, EventHandlerFactory};
use crate::hash;
use crate::metrics;
use crate::record::EventRecord;
use crate::retry::retry_until_success;
use crate::storage::EventStorage;
use crate::transport::EventTransport;

const POLL_IDLE_DELAY: Duration = Duration::from_millis(300);
const STREAM_REOPEN_DELAY: Duration = Duration::from_secs(5);

/// The two long-running tasks backing a single (event type, handler
/// type) subscription. Dropping this does not stop the tasks; call
/// [`SubscriberHandle::shutdown`] (or cancel the token passed to
/// [`spawn`]) for a clean stop.
pub struct SubscriberHandle<E> {
    pub subscriber_id: u128,
    producer: JoinHandle<()>,
    consumer: JoinHandle<()>,
    _marker: PhantomData<E>,
}

impl<E> SubscriberHandle<E> {
    /// Aborts both tasks immediately. Prefer cancelling the shutdown
    /// token passed to [`spawn`] for a task that observes in-flight
    /// work; this is for tests and emergency teardown.
    pub fn abort(&self) {
        self.producer.abort();
        self.consumer.abort();
    }
}

/// Spawns the producer and consumer tasks for one subscriber.
///
/// `host_identity`, `handler_type`, and `channel_target` together
/// derive the stable `subscriber_id` that partitions this subscriber's
/// event records from every other subscriber sharing the same store.
#[allow(clippy::too_many_arguments)]
pub fn spawn<E, T, S, F>(
    host_identity: &str,
    handler_type: &str,
    channel_target: &str,
    transport: Arc<T>,
    storage: Arc<S>,
    handler_factory: Arc<F>,
    shutdown: CancellationToken,
) -> SubscriberHandle<E>
where
    E: Event,
    T: EventTransport<E> + 'static,
    S: EventStorage + 'static,
    F: EventHandlerFactory<E> + 'static,
{
    let subscriber_id = hash::subscriber_id(host_identity, handler_type, channel_target);

    let producer = tokio::spawn(run_producer(subscriber_id, transport, storage.clone(), shutdown.clone()));
    let consumer = tokio::spawn(run_consumer(subscriber_id, storage, handler_factory, shutdown));

    SubscriberHandle {
        subscriber_id,
        producer,
        consumer,
        _marker: PhantomData,
    }
}

async fn run_producer<E, T, S>(
    subscriber_id: u128,
    transport: Arc<T>,
    storage: Arc<S>,
    shutdown: CancellationToken,
) where
    E: Event,
    T: EventTransport<E> + 'static,
    S: EventStorage + 'static,
{
    loop {
        if shutdown.is_cancelled() {
            return;
        }

        let mut stream = match transport.subscribe(subscriber_id).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, subscriber_id, "failed to open event stream, retrying in 5s");
                if sleep_or_shutdown(STREAM_REOPEN_DELAY, &shutdown).await {
                    return;
                }
                continue;
            }
        };

        // Drained until the stream itself ends or errors; either one
        // sends us back around the outer loop to reopen it.
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => return,
                item = stream.next() => item,
            };

            match next {
                Some(Ok(event)) => store_event(subscriber_id, &event, &storage, &shutdown).await,
                Some(Err(TransportError(e))) => {
                    warn!(error = %e, subscriber_id, "event stream errored, reopening in 5s");
                    break;
                }
                None => {
                    debug!(subscriber_id, "event stream ended, reopening in 5s");
                    break;
                }
            }
        }

        if sleep_or_shutdown(STREAM_REOPEN_DELAY, &shutdown).await {
            return;
        }
    }
}

async fn store_event<E, S>(subscriber_id: u128, event: &E, storage: &Arc<S>, shutdown: &CancellationToken)
where
    E: Event,
    S: EventStorage + 'static,
{
    let value = match serde_json::to_value(event) {
        Ok(value) => value,
        Err(e) => {
            error!(error = %e, subscriber_id, "failed to serialize received event, dropping it");
            return;
        }
    };

    let record = EventRecord {
        id: uuid::Uuid::new_v4(),
        subscriber_id,
        event_type: E::TYPE_NAME.to_string(),
        event: value,
        expire_on: Utc::now() + chrono::Duration::hours(4),
        is_complete: false,
    };

    retry_until_success(|| storage.store_event(&record), shutdown).await;
    metrics::record_event_stored(E::TYPE_NAME);
}

async fn run_consumer<E, S, F>(
    subscriber_id: u128,
    storage: Arc<S>,
    handler_factory: Arc<F>,
    shutdown: CancellationToken,
) where
    E: Event,
    S: EventStorage + 'static,
    F: EventHandlerFactory<E> + 'static,
{
    loop {
        if shutdown.is_cancelled() {
            return;
        }

        let record = match storage.get_next_event(subscriber_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                if sleep_or_shutdown(POLL_IDLE_DELAY, &shutdown).await {
                    return;
                }
                continue;
            }
            Err(e) => {
                warn!(error = %e, subscriber_id, "failed to poll for next event, retrying in 5s");
                if sleep_or_shutdown(STREAM_REOPEN_DELAY, &shutdown).await {
                    return;
                }
                continue;
            }
        };

        let event: E = match serde_json::from_value(record.event.clone()) {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, subscriber_id, id = %record.id, "failed to deserialize stored event");
                if sleep_or_shutdown(STREAM_REOPEN_DELAY, &shutdown).await {
                    return;
                }
                continue;
            }
        };

        let handler = handler_factory.create();
        match handler.handle(&event).await {
            Ok(()) => {
                retry_until_success(|| storage.mark_event_complete(record.id), &shutdown).await;
                metrics::record_event_completed(E::TYPE_NAME);
            }
            Err(e) => {
                error!(error = %e, subscriber_id, id = %record.id, "event handler failed, will retry on next poll");
                if sleep_or_shutdown(STREAM_REOPEN_DELAY, &shutdown).await {
                    return;
                }
            }
        }
    }
}

/// Sleeps for `delay` unless `shutdown` fires first. Returns `true` if
/// shutdown won the race, so the caller should stop looping.
async fn sleep_or_shutdown(delay: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
