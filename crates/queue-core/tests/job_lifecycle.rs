//! End-to-end job queue scenarios against the in-process `queue-memory`
//! provider: happy path, deferred execution, cancel before run, cancel
//! during run, handler exception, and storage flaps.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use queue_core::{Command, ExecutionError, JobQueue, JobStorage, QueueConfig, QueueRegistry};
use queue_memory::MemoryJobStorage;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Serialize, Deserialize)]
struct CountAndSignal;

static COMPLETIONS: AtomicUsize = AtomicUsize::new(0);

#[async_trait]
impl Command for CountAndSignal {
    const TYPE_NAME: &'static str = "job_lifecycle::CountAndSignal";

    async fn execute(&self, _cancellation: CancellationToken) -> Result<(), ExecutionError> {
        COMPLETIONS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn happy_path_job_runs_and_is_marked_complete() {
    let before = COMPLETIONS.load(Ordering::SeqCst);
    let storage = Arc::new(MemoryJobStorage::new());
    let shutdown = CancellationToken::new();
    let registry = QueueRegistry::new();

    let queue = JobQueue::<CountAndSignal, _>::new(storage.clone(), shutdown.clone(), &registry).await;
    queue.set_limits(QueueConfig::new(4));

    let tracking_id = queue_core::enqueue(&registry, &CountAndSignal, None, None)
        .await
        .unwrap();

    assert!(wait_until(|| COMPLETIONS.load(Ordering::SeqCst) > before, Duration::from_secs(2)).await);

    let now = Utc::now();
    let remaining = storage.get_next_batch(queue.queue_id(), 10, now).await.unwrap();
    assert!(remaining.iter().all(|r| r.tracking_id != tracking_id));

    shutdown.cancel();
}

#[derive(Debug, Serialize, Deserialize)]
struct RunOnceLater;

static FUTURE_COMPLETIONS: AtomicUsize = AtomicUsize::new(0);

#[async_trait]
impl Command for RunOnceLater {
    const TYPE_NAME: &'static str = "job_lifecycle::RunOnceLater";

    async fn execute(&self, _cancellation: CancellationToken) -> Result<(), ExecutionError> {
        FUTURE_COMPLETIONS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn deferred_job_does_not_run_before_its_execute_after() {
    let storage = Arc::new(MemoryJobStorage::new());
    let shutdown = CancellationToken::new();
    let registry = QueueRegistry::new();

    let queue = JobQueue::<RunOnceLater, _>::new(storage.clone(), shutdown.clone(), &registry).await;
    queue.set_limits(QueueConfig::new(2).with_sem_wait_limit(Duration::from_millis(200)));

    let execute_after = Utc::now() + chrono::Duration::milliseconds(500);
    queue_core::enqueue(&registry, &RunOnceLater, Some(execute_after), None)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(FUTURE_COMPLETIONS.load(Ordering::SeqCst), 0);

    assert!(wait_until(|| FUTURE_COMPLETIONS.load(Ordering::SeqCst) == 1, Duration::from_secs(2)).await);

    shutdown.cancel();
}

#[derive(Debug, Serialize, Deserialize)]
struct NeverRuns;

static NEVER_RAN: AtomicUsize = AtomicUsize::new(0);

#[async_trait]
impl Command for NeverRuns {
    const TYPE_NAME: &'static str = "job_lifecycle::NeverRuns";

    async fn execute(&self, _cancellation: CancellationToken) -> Result<(), ExecutionError> {
        NEVER_RAN.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn cancel_before_run_prevents_dispatch() {
    let storage = Arc::new(MemoryJobStorage::new());
    let shutdown = CancellationToken::new();
    let registry = QueueRegistry::new();

    let queue = JobQueue::<NeverRuns, _>::new(storage.clone(), shutdown.clone(), &registry).await;

    let execute_after = Utc::now() + chrono::Duration::seconds(30);
    let tracking_id = queue_core::enqueue(&registry, &NeverRuns, Some(execute_after), None)
        .await
        .unwrap();

    queue_core::cancel::<NeverRuns>(&registry, tracking_id).await.unwrap();
    queue.set_limits(QueueConfig::new(2).with_sem_wait_limit(Duration::from_millis(100)));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(NEVER_RAN.load(Ordering::SeqCst), 0);

    shutdown.cancel();
}

#[derive(Debug, Serialize, Deserialize)]
struct WaitForCancellation;

static CANCELLED_MID_RUN: AtomicUsize = AtomicUsize::new(0);
static STARTED_RUNNING: AtomicUsize = AtomicUsize::new(0);

#[async_trait]
impl Command for WaitForCancellation {
    const TYPE_NAME: &'static str = "job_lifecycle::WaitForCancellation";

    async fn execute(&self, cancellation: CancellationToken) -> Result<(), ExecutionError> {
        STARTED_RUNNING.fetch_add(1, Ordering::SeqCst);
        cancellation.cancelled().await;
        CANCELLED_MID_RUN.fetch_add(1, Ordering::SeqCst);
        Err(ExecutionError::from("cancelled mid-run"))
    }
}

#[tokio::test]
async fn cancel_during_run_trips_the_in_flight_token() {
    let storage = Arc::new(MemoryJobStorage::new());
    let shutdown = CancellationToken::new();
    let registry = QueueRegistry::new();

    let queue = JobQueue::<WaitForCancellation, _>::new(storage.clone(), shutdown.clone(), &registry).await;
    queue.set_limits(QueueConfig::new(2));

    let tracking_id = queue_core::enqueue(&registry, &WaitForCancellation, None, None)
        .await
        .unwrap();

    assert!(wait_until(|| STARTED_RUNNING.load(Ordering::SeqCst) == 1, Duration::from_secs(2)).await);

    queue_core::cancel::<WaitForCancellation>(&registry, tracking_id).await.unwrap();

    assert!(wait_until(|| CANCELLED_MID_RUN.load(Ordering::SeqCst) == 1, Duration::from_secs(2)).await);

    shutdown.cancel();
}

#[derive(Debug, Serialize, Deserialize)]
struct AlwaysFails;

#[async_trait]
impl Command for AlwaysFails {
    const TYPE_NAME: &'static str = "job_lifecycle::AlwaysFails";

    async fn execute(&self, _cancellation: CancellationToken) -> Result<(), ExecutionError> {
        Err(ExecutionError::from("handler blew up"))
    }
}

#[tokio::test]
async fn handler_error_never_marks_the_job_complete() {
    let storage = Arc::new(MemoryJobStorage::new());
    let shutdown = CancellationToken::new();
    let registry = QueueRegistry::new();

    let queue = JobQueue::<AlwaysFails, _>::new(storage.clone(), shutdown.clone(), &registry).await;
    queue.set_limits(QueueConfig::new(2));

    let tracking_id = queue_core::enqueue(&registry, &AlwaysFails, None, None)
        .await
        .unwrap();

    // Give the drain task a few passes to pick this up and fail it
    // repeatedly; it must never transition to complete.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let now = Utc::now();
    let batch = storage.get_next_batch(queue.queue_id(), 10, now).await.unwrap();
    assert!(batch.iter().any(|r| r.tracking_id == tracking_id && !r.is_complete));

    shutdown.cancel();
}

/// Wraps `MemoryJobStorage` so the first few `get_next_batch` calls
/// fail, exercising the drain loop's fetch-error retry path.
struct FlappyStorage {
    inner: MemoryJobStorage,
    remaining_failures: AtomicUsize,
}

#[derive(Debug, thiserror::Error)]
#[error("storage is flapping")]
struct FlapError;

#[async_trait]
impl queue_core::JobStorage for FlappyStorage {
    type Error = FlapError;

    async fn store_job(&self, record: &queue_core::JobRecord) -> Result<(), Self::Error> {
        self.inner.store_job(record).await.map_err(|_| FlapError)
    }

    async fn get_next_batch(
        &self,
        queue_id: u128,
        limit: usize,
        now: chrono::DateTime<Utc>,
    ) -> Result<Vec<queue_core::JobRecord>, Self::Error> {
        if self.remaining_failures.fetch_sub(1, Ordering::SeqCst) > 0 {
            return Err(FlapError);
        }
        self.inner.get_next_batch(queue_id, limit, now).await.map_err(|_| FlapError)
    }

    async fn mark_job_complete(&self, tracking_id: uuid::Uuid) -> Result<(), Self::Error> {
        self.inner.mark_job_complete(tracking_id).await.map_err(|_| FlapError)
    }

    async fn cancel_job(&self, tracking_id: uuid::Uuid) -> Result<(), Self::Error> {
        self.inner.cancel_job(tracking_id).await.map_err(|_| FlapError)
    }

    async fn on_handler_execution_failure(&self, tracking_id: uuid::Uuid, error: &str) -> Result<(), Self::Error> {
        self.inner.on_handler_execution_failure(tracking_id, error).await.map_err(|_| FlapError)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SurvivesFlappyStorage;

static SURVIVED_FLAP: AtomicUsize = AtomicUsize::new(0);

#[async_trait]
impl Command for SurvivesFlappyStorage {
    const TYPE_NAME: &'static str = "job_lifecycle::SurvivesFlappyStorage";

    async fn execute(&self, _cancellation: CancellationToken) -> Result<(), ExecutionError> {
        SURVIVED_FLAP.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn drain_loop_recovers_after_storage_flaps() {
    let storage = Arc::new(FlappyStorage {
        inner: MemoryJobStorage::new(),
        remaining_failures: AtomicUsize::new(1),
    });
    let shutdown = CancellationToken::new();
    let registry = QueueRegistry::new();

    let queue = JobQueue::<SurvivesFlappyStorage, _>::new(storage.clone(), shutdown.clone(), &registry).await;
    queue.set_limits(QueueConfig::new(2));

    queue_core::enqueue(&registry, &SurvivesFlappyStorage, None, None)
        .await
        .unwrap();

    // The drain loop retries fetch failures on a 5s backoff; allow
    // enough time for the flakiness to clear and the job to run.
    let notify = Arc::new(Notify::new());
    let watcher_notify = notify.clone();
    tokio::spawn(async move {
        while SURVIVED_FLAP.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        watcher_notify.notify_one();
    });

    tokio::time::timeout(Duration::from_secs(10), notify.notified())
        .await
        .expect("job never ran despite storage recovering");

    shutdown.cancel();
}
