use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ExecutionError;

/// A unit of data delivered through the event subscriber pipeline.
pub trait Event: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable name identifying this event type, stored alongside the
    /// serialized payload so storage providers can filter or inspect
    /// it without deserializing.
    const TYPE_NAME: &'static str;
}

/// Handles a single event. A fresh instance is created per delivery via
/// an `EventHandlerFactory`, so implementations may hold per-delivery
/// state without worrying about it leaking across invocations.
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync {
    async fn handle(&self, event: &E) -> Result<(), ExecutionError>;
}

/// Produces a fresh `EventHandler` for each event the consumer task
/// pulls off storage.
pub trait EventHandlerFactory<E: Event>: Send + Sync {
    fn create(&self) -> Box<dyn EventHandler<E>>;
}
