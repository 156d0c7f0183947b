use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Tracks the cancellation token for every job currently executing, so
/// a `cancel_job` call can reach a job that is already in flight.
///
/// Entries are removed as soon as a job finishes, so this map only
/// ever holds tokens for in-flight work, never the full job history.
#[derive(Clone)]
pub struct CancellationRegistry {
    inner: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn insert(&self, tracking_id: Uuid, token: CancellationToken) {
        self.inner.write().await.insert(tracking_id, token);
    }

    pub async fn remove(&self, tracking_id: Uuid) {
        self.inner.write().await.remove(&tracking_id);
    }

    /// Cancels the job if it is currently in flight. Returns `true` if
    /// a token was found. A job that has not yet been picked up, or
    /// that already finished, is not represented here at all: the
    /// caller is still expected to mark it cancelled in storage.
    pub async fn cancel(&self, tracking_id: Uuid) -> bool {
        match self.inner.read().await.get(&tracking_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

impl Default for CancellationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
