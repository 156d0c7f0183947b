//! Local runnable demo of the job queue and event subscriber pipeline.
//!
//! Wires `queue-core`'s `JobQueue` and subscriber pipeline to the
//! in-process `queue-memory` providers, so the whole flow runs without
//! a database or a real event transport: enqueue a `SendWelcomeEmail`
//! command, publish a `SignupCompleted` event, and watch both drain.

use std::sync::Arc;
use std::time::Duration;

use app_config::Environment;
use async_trait::async_trait;
use queue_core::{Command, Event, EventHandler, EventHandlerFactory, ExecutionError, JobQueue, QueueConfig, QueueRegistry};
use queue_memory::{MemoryEventStorage, MemoryEventTransport, MemoryJobStorage};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
struct SendWelcomeEmail {
    recipient: String,
}

#[async_trait]
impl Command for SendWelcomeEmail {
    const TYPE_NAME: &'static str = "queue_demo::SendWelcomeEmail";

    async fn execute(&self, _cancellation: CancellationToken) -> Result<(), ExecutionError> {
        info!(recipient = %self.recipient, "sent welcome email");
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SignupCompleted {
    user_id: u64,
}

impl Event for SignupCompleted {
    const TYPE_NAME: &'static str = "queue_demo::SignupCompleted";
}

struct LogSignupHandler;

#[async_trait]
impl EventHandler<SignupCompleted> for LogSignupHandler {
    async fn handle(&self, event: &SignupCompleted) -> Result<(), ExecutionError> {
        info!(user_id = event.user_id, "processed signup completion event");
        Ok(())
    }
}

struct LogSignupHandlerFactory;

impl EventHandlerFactory<SignupCompleted> for LogSignupHandlerFactory {
    fn create(&self) -> Box<dyn EventHandler<SignupCompleted>> {
        Box::new(LogSignupHandler)
    }
}

#[tokio::main]
async fn main() {
    let environment = Environment::from_env();
    app_config::init_tracing(&environment);

    let shutdown = CancellationToken::new();
    let registry = QueueRegistry::new();

    let job_storage = Arc::new(MemoryJobStorage::new());
    let queue = JobQueue::<SendWelcomeEmail, _>::new(job_storage, shutdown.clone(), &registry).await;
    queue.set_limits(QueueConfig::new(4).with_sem_wait_limit(Duration::from_secs(10)));

    let tracking_id = queue_core::enqueue(&registry, &SendWelcomeEmail { recipient: "demo@example.com".into() }, None, None)
        .await
        .expect("SendWelcomeEmail queue is registered");
    info!(%tracking_id, "enqueued welcome email");

    let event_storage = Arc::new(MemoryEventStorage::new());
    let transport = MemoryEventTransport::<SignupCompleted>::new();
    let subscriber = queue_core::subscriber::spawn(
        "queue-demo",
        "LogSignupHandler",
        "signups",
        transport.clone(),
        event_storage,
        Arc::new(LogSignupHandlerFactory),
        shutdown.clone(),
    );
    transport.publish(subscriber.subscriber_id, SignupCompleted { user_id: 42 }).await;

    tokio::time::sleep(Duration::from_millis(500)).await;
    shutdown.cancel();
    info!("demo complete, shutting down");
}
