use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::ExecutionError;

/// A unit of deferred work that knows how to run itself.
///
/// Unlike the split job/processor pair this is generalized from, a
/// `Command` owns its own execution logic: the queue only ever
/// deserializes a stored payload and calls `execute`. This keeps a
/// command and the handler for it from drifting apart when a new
/// command type is added.
#[async_trait]
pub trait Command: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable name identifying this command type. Used to derive the
    /// queue's identity, so it must never change once jobs of this
    /// type exist in storage.
    const TYPE_NAME: &'static str;

    /// Run the command. `cancellation` is cancelled when the caller
    /// requests cancellation, or when an execution time limit elapses,
    /// whichever comes first. Implementations that perform long-running
    /// work should observe it.
    async fn execute(&self, cancellation: CancellationToken) -> Result<(), ExecutionError>;
}
