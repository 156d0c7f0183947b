use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::cancellation::CancellationRegistry;
use crate::command::Command;
use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::hash;
use crate::metrics;
use crate::record::JobRecord;
use crate::registry::QueueRegistry;
use crate::retry::retry_until_success;
use crate::storage::JobStorage;

/// A type-erased handle to a running queue, used by the registry so
/// callers don't need to carry the queue's storage type around.
#[async_trait]
pub trait QueueHandle: Send + Sync {
    fn command_type_name(&self) -> &'static str;

    async fn store_job_dyn(
        &self,
        command: serde_json::Value,
        execute_after: Option<DateTime<Utc>>,
        expire_on: Option<DateTime<Utc>>,
    ) -> Result<Uuid, QueueError>;

    async fn cancel_job(&self, tracking_id: Uuid) -> Result<(), QueueError>;
}

/// One queue per command type `C`, backed by storage provider `S`.
///
/// Construct with [`JobQueue::new`], then call [`JobQueue::set_limits`]
/// exactly once to start the background drain task.
pub struct JobQueue<C: Command, S: JobStorage> {
    storage: Arc<S>,
    queue_id: u128,
    semaphore: Arc<Semaphore>,
    is_in_use: Arc<AtomicBool>,
    in_flight: Arc<AtomicI64>,
    cancellations: CancellationRegistry,
    shutdown: CancellationToken,
    drain_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
    _marker: PhantomData<C>,
}

impl<C: Command, S: JobStorage + 'static> JobQueue<C, S> {
    /// Builds a queue for command type `C` and registers it into
    /// `registry` under `C`'s `TypeId`, so the [`crate::enqueue`] and
    /// [`crate::cancel`] façade can find it. Call [`JobQueue::set_limits`]
    /// afterward to start the drain task.
    pub async fn new(storage: Arc<S>, shutdown: CancellationToken, registry: &QueueRegistry) -> Arc<Self> {
        let this = Arc::new(Self {
            storage,
            queue_id: hash::queue_id_for::<C>(),
            semaphore: Arc::new(Semaphore::new(0)),
            is_in_use: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(AtomicI64::new(0)),
            cancellations: CancellationRegistry::new(),
            shutdown,
            drain_handle: std::sync::Mutex::new(None),
            _marker: PhantomData,
        });
        registry.register::<C>(this.clone() as Arc<dyn QueueHandle>).await;
        this
    }

    pub fn queue_id(&self) -> u128 {
        self.queue_id
    }

    /// Starts the background drain task with the given tuning. Must be
    /// called once before jobs stored on this queue will ever run.
    pub fn set_limits(self: &Arc<Self>, config: QueueConfig) {
        let storage = Arc::clone(&self.storage);
        let queue_id = self.queue_id;
        let semaphore = Arc::clone(&self.semaphore);
        let is_in_use = Arc::clone(&self.is_in_use);
        let in_flight = Arc::clone(&self.in_flight);
        let cancellations = self.cancellations.clone();
        let shutdown = self.shutdown.clone();

        let drain_task = tokio::spawn(async move {
            run_drain_loop::<C, S>(
                storage,
                queue_id,
                config,
                semaphore,
                is_in_use,
                in_flight,
                cancellations,
                shutdown,
            )
            .await;
        });

        // Wrap the drain task so a panic is logged instead of silently
        // swallowed when nobody awaits its `JoinHandle`.
        let handle = tokio::spawn(async move {
            if let Err(e) = drain_task.await {
                error!(command_type = C::TYPE_NAME, error = %e, "drain task terminated unexpectedly");
            }
        });

        *self.drain_handle.lock().expect("drain handle mutex poisoned") = Some(handle);
    }

    pub async fn store_job(
        &self,
        command: &C,
        execute_after: Option<DateTime<Utc>>,
        expire_on: Option<DateTime<Utc>>,
    ) -> Result<Uuid, QueueError> {
        let value = serde_json::to_value(command)?;
        self.store_job_value(value, execute_after, expire_on).await
    }

    async fn store_job_value(
        &self,
        command: serde_json::Value,
        execute_after: Option<DateTime<Utc>>,
        expire_on: Option<DateTime<Utc>>,
    ) -> Result<Uuid, QueueError> {
        self.is_in_use.store(true, Ordering::SeqCst);

        let now = Utc::now();
        let tracking_id = Uuid::new_v4();
        let record = JobRecord {
            tracking_id,
            queue_id: self.queue_id,
            command,
            execute_after: execute_after.unwrap_or(now),
            expire_on: expire_on.unwrap_or_else(|| now + chrono::Duration::hours(4)),
            is_complete: false,
        };

        self.storage
            .store_job(&record)
            .await
            .map_err(|e| QueueError::Storage(e.to_string()))?;

        self.semaphore.add_permits(1);
        debug!(tracking_id = %tracking_id, queue_id = self.queue_id, "job stored");
        metrics::record_stored(C::TYPE_NAME);
        Ok(tracking_id)
    }

    pub async fn cancel_job(&self, tracking_id: Uuid) -> Result<(), QueueError> {
        let result = self
            .storage
            .cancel_job(tracking_id)
            .await
            .map_err(|e| QueueError::Storage(e.to_string()));
        self.cancellations.cancel(tracking_id).await;
        result
    }
}

#[async_trait]
impl<C: Command, S: JobStorage + 'static> QueueHandle for JobQueue<C, S> {
    fn command_type_name(&self) -> &'static str {
        C::TYPE_NAME
    }

    async fn store_job_dyn(
        &self,
        command: serde_json::Value,
        execute_after: Option<DateTime<Utc>>,
        expire_on: Option<DateTime<Utc>>,
    ) -> Result<Uuid, QueueError> {
        self.store_job_value(command, execute_after, expire_on).await
    }

    async fn cancel_job(&self, tracking_id: Uuid) -> Result<(), QueueError> {
        JobQueue::cancel_job(self, tracking_id).await
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_drain_loop<C, S>(
    storage: Arc<S>,
    queue_id: u128,
    config: QueueConfig,
    semaphore: Arc<Semaphore>,
    is_in_use: Arc<AtomicBool>,
    in_flight: Arc<AtomicI64>,
    cancellations: CancellationRegistry,
    shutdown: CancellationToken,
) where
    C: Command,
    S: JobStorage + 'static,
{
    let batch_size = config.batch_size();

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        let now = Utc::now();
        let batch = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = storage.get_next_batch(queue_id, batch_size, now) => result,
        };

        let records = match batch {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, command_type = C::TYPE_NAME, "failed to fetch next batch, retrying in 5s");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(5)) => {}
                }
                continue;
            }
        };

        if records.is_empty() {
            if is_in_use.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    result = tokio::time::timeout(config.sem_wait_limit, semaphore.acquire()) => {
                        // A won permit belongs to a record `get_next_batch`
                        // didn't return (deferred, expired, or cancelled but
                        // not yet due) — consume it so the idle wait doesn't
                        // immediately re-trigger on the same stale permit.
                        if let Ok(Ok(permit)) = result {
                            permit.forget();
                        }
                    }
                }
            } else {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    permit = semaphore.acquire() => { drop(permit); }
                }
            }
            continue;
        }

        metrics::record_drained(C::TYPE_NAME, records.len());

        // Drain the wakeup permits this batch accounts for, so a
        // future idle wait doesn't return immediately on stale signals
        // left over from jobs this batch already picked up.
        for _ in 0..records.len() {
            if semaphore.try_acquire().is_err() {
                break;
            }
        }

        let concurrency = Arc::new(Semaphore::new(config.concurrency_limit));
        let mut batch_tasks = JoinSet::new();

        for record in records {
            let concurrency = Arc::clone(&concurrency);
            let storage = Arc::clone(&storage);
            let cancellations = cancellations.clone();
            let shutdown = shutdown.clone();
            let in_flight = Arc::clone(&in_flight);
            let execution_time_limit = config.execution_time_limit;

            batch_tasks.spawn(async move {
                let _permit = match concurrency.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                in_flight.fetch_add(1, Ordering::SeqCst);
                metrics::set_in_flight(C::TYPE_NAME, in_flight.load(Ordering::SeqCst));

                execute_one::<C, S>(record, storage, cancellations, execution_time_limit, shutdown).await;

                in_flight.fetch_sub(1, Ordering::SeqCst);
                metrics::set_in_flight(C::TYPE_NAME, in_flight.load(Ordering::SeqCst));
            });
        }

        while batch_tasks.join_next().await.is_some() {}
    }
}

async fn execute_one<C, S>(
    record: JobRecord,
    storage: Arc<S>,
    cancellations: CancellationRegistry,
    execution_time_limit: Option<Duration>,
    shutdown: CancellationToken,
) where
    C: Command,
    S: JobStorage + 'static,
{
    let tracking_id = record.tracking_id;
    let token = CancellationToken::new();
    cancellations.insert(tracking_id, token.clone()).await;

    let deadline_guard = execution_time_limit.map(|limit| {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(limit) => token.cancel(),
                _ = token.cancelled() => {}
            }
        })
    });

    let command: C = match serde_json::from_value(record.command.clone()) {
        Ok(command) => command,
        Err(e) => {
            error!(tracking_id = %tracking_id, error = %e, "failed to deserialize stored command");
            cancellations.remove(tracking_id).await;
            if let Some(handle) = deadline_guard {
                handle.abort();
            }
            metrics::record_failed(C::TYPE_NAME);
            let message = e.to_string();
            retry_until_success(
                || storage.on_handler_execution_failure(tracking_id, &message),
                &shutdown,
            )
            .await;
            return;
        }
    };

    let result = command.execute(token.clone()).await;

    cancellations.remove(tracking_id).await;
    if let Some(handle) = deadline_guard {
        handle.abort();
    }

    match result {
        Ok(()) => {
            metrics::record_completed(C::TYPE_NAME);
            retry_until_success(|| storage.mark_job_complete(tracking_id), &shutdown).await;
        }
        Err(e) => {
            error!(tracking_id = %tracking_id, error = %e, "command execution failed");
            metrics::record_failed(C::TYPE_NAME);
            let message = e.to_string();
            retry_until_success(
                || storage.on_handler_execution_failure(tracking_id, &message),
                &shutdown,
            )
            .await;
        }
    }
}
