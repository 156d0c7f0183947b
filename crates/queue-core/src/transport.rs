use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::TransportError;
use crate::event::Event;

/// A boxed stream of events, as handed back by an `EventTransport`.
pub type EventStream<E> = Pin<Box<dyn Stream<Item = Result<E, TransportError>> + Send>>;

/// An opaque source of events for a given subscriber. Implementations
/// decide what "subscribing" means: a broker topic, an in-process
/// channel, a polling loop wrapped in a stream, all look identical
/// from here.
#[async_trait]
pub trait EventTransport<E: Event>: Send + Sync {
    async fn subscribe(&self, subscriber_id: u128) -> Result<EventStream<E>, TransportError>;
}
