use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use queue_core::{Event, EventStream, EventTransport, TransportError};
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// In-process `EventTransport` backed by an `mpsc` channel per
/// subscriber, for local runs and tests that need to push events
/// without standing up a real broker.
///
/// [`MemoryEventTransport::publish`] is how a test or demo binary
/// feeds events in; `subscribe` is what the producer task calls.
pub struct MemoryEventTransport<E> {
    senders: Mutex<HashMap<u128, mpsc::UnboundedSender<Result<E, TransportError>>>>,
}

impl<E: Event> MemoryEventTransport<E> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            senders: Mutex::new(HashMap::new()),
        })
    }

    /// Delivers `event` to whichever subscriber currently holds
    /// `subscriber_id`'s channel. Silently dropped if nobody has
    /// subscribed yet, mirroring a real broker topic with no
    /// consumers attached.
    pub async fn publish(&self, subscriber_id: u128, event: E) {
        let senders = self.senders.lock().await;
        if let Some(sender) = senders.get(&subscriber_id) {
            let _ = sender.send(Ok(event));
        }
    }
}

#[async_trait]
impl<E: Event> EventTransport<E> for MemoryEventTransport<E> {
    async fn subscribe(&self, subscriber_id: u128) -> Result<EventStream<E>, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().await.insert(subscriber_id, tx);
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Ping(u32);

    impl Event for Ping {
        const TYPE_NAME: &'static str = "Ping";
    }

    #[tokio::test]
    async fn published_events_reach_the_subscribed_stream() {
        use futures::StreamExt;

        let transport = MemoryEventTransport::<Ping>::new();
        let mut stream = transport.subscribe(1).await.unwrap();

        transport.publish(1, Ping(42)).await;

        let received = stream.next().await.unwrap().unwrap();
        assert_eq!(received, Ping(42));
    }
}
