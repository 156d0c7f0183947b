use std::time::Duration;

/// Tuning knobs for a single command queue's drain task.
///
/// Mirrors the builder style used throughout this codebase: construct
/// with the one mandatory setting, then layer on the rest.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of jobs executed concurrently by this queue.
    pub concurrency_limit: usize,
    /// Hard ceiling on how long a single job's `execute` may run
    /// before its cancellation token is tripped. `None` means no limit.
    pub execution_time_limit: Option<Duration>,
    /// How long the drain task waits for a permit to free up before
    /// re-checking storage for newly due jobs, when the queue is
    /// already known to have work queued.
    pub sem_wait_limit: Duration,
}

const DEFAULT_SEM_WAIT_LIMIT: Duration = Duration::from_secs(60);

impl QueueConfig {
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            concurrency_limit,
            execution_time_limit: None,
            sem_wait_limit: DEFAULT_SEM_WAIT_LIMIT,
        }
    }

    pub fn with_execution_time_limit(mut self, limit: Duration) -> Self {
        self.execution_time_limit = Some(limit);
        self
    }

    pub fn with_sem_wait_limit(mut self, limit: Duration) -> Self {
        self.sem_wait_limit = limit;
        self
    }

    /// The drain task asks storage for this many due jobs at once:
    /// twice the concurrency limit, so a full batch keeps every worker
    /// slot fed while the next batch is being fetched.
    pub fn batch_size(&self) -> usize {
        self.concurrency_limit.saturating_mul(2).max(1)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new(1)
    }
}
