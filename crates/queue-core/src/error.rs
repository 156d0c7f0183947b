use thiserror::Error;

/// Error surfaced by a command's `execute` or an event handler's `handle`.
///
/// Intentionally just a message: the queue does not categorize handler
/// failures, it only logs them and leaves the record for the next drain
/// or poll cycle to retry.
#[derive(Debug, Error, Clone)]
#[error("{0}")]
pub struct ExecutionError(pub String);

impl From<String> for ExecutionError {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ExecutionError {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Error surfaced by the queue engine itself, as distinct from a
/// handler's own business-logic failure.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error surfaced by the facade functions (`enqueue`, `cancel`) that
/// sit in front of the per-command-type queue registry.
#[derive(Debug, Error)]
pub enum FacadeError {
    #[error("no queue registered for this command type")]
    NoQueueRegistered,

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Error surfaced by an `EventTransport` while opening or reading from
/// its underlying stream.
#[derive(Debug, Error, Clone)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);
