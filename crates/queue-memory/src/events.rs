use async_trait::async_trait;
use queue_core::{EventRecord, EventStorage};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::MemoryStorageError;

/// In-process `EventStorage` backed by a `Vec` guarded by a single
/// mutex, mirroring [`crate::MemoryJobStorage`].
#[derive(Default)]
pub struct MemoryEventStorage {
    events: Mutex<Vec<EventRecord>>,
}

impl MemoryEventStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStorage for MemoryEventStorage {
    type Error = MemoryStorageError;

    async fn store_event(&self, record: &EventRecord) -> Result<(), Self::Error> {
        self.events.lock().await.push(record.clone());
        Ok(())
    }

    async fn get_next_event(&self, subscriber_id: u128) -> Result<Option<EventRecord>, Self::Error> {
        let now = chrono::Utc::now();
        let events = self.events.lock().await;
        Ok(events
            .iter()
            .find(|e| e.subscriber_id == subscriber_id && !e.is_complete && now <= e.expire_on)
            .cloned())
    }

    async fn mark_event_complete(&self, id: Uuid) -> Result<(), Self::Error> {
        let mut events = self.events.lock().await;
        if let Some(event) = events.iter_mut().find(|e| e.id == id) {
            event.is_complete = true;
        }
        Ok(())
    }
}
