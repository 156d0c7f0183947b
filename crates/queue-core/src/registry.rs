use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::queue::QueueHandle;

/// Process-wide directory from a command type to the queue instance
/// serving it.
///
/// Populated exactly once per type, at queue construction, by the
/// host's object graph; read on every [`crate::enqueue`] and
/// [`crate::cancel`] call. This is a plain struct the host owns and
/// threads through explicitly (typically behind an `Arc` alongside the
/// rest of its runtime state) rather than a process `static`.
#[derive(Clone, Default)]
pub struct QueueRegistry {
    queues: Arc<RwLock<HashMap<TypeId, Arc<dyn QueueHandle>>>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handle` as the queue serving command type `C`.
    ///
    /// Intended to be called once, at construction, by whatever builds
    /// the `JobQueue<C, S>`. A second registration for the same `C`
    /// replaces the first; the core does not guard against that, since
    /// the host's object graph is expected to build each queue exactly
    /// once.
    pub async fn register<C: 'static>(&self, handle: Arc<dyn QueueHandle>) {
        self.queues.write().await.insert(TypeId::of::<C>(), handle);
    }

    /// Looks up the queue handle registered for command type `C`, if
    /// any.
    pub async fn get<C: 'static>(&self) -> Option<Arc<dyn QueueHandle>> {
        self.queues.read().await.get(&TypeId::of::<C>()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::error::{ExecutionError, QueueError};
    use crate::queue::QueueHandle;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    #[derive(Serialize, Deserialize)]
    struct Foo;

    #[async_trait]
    impl Command for Foo {
        const TYPE_NAME: &'static str = "Foo";
        async fn execute(&self, _cancellation: CancellationToken) -> Result<(), ExecutionError> {
            Ok(())
        }
    }

    #[derive(Serialize, Deserialize)]
    struct Bar;

    #[async_trait]
    impl Command for Bar {
        const TYPE_NAME: &'static str = "Bar";
        async fn execute(&self, _cancellation: CancellationToken) -> Result<(), ExecutionError> {
            Ok(())
        }
    }

    struct StubHandle;

    #[async_trait]
    impl QueueHandle for StubHandle {
        fn command_type_name(&self) -> &'static str {
            "Foo"
        }

        async fn store_job_dyn(
            &self,
            _command: serde_json::Value,
            _execute_after: Option<DateTime<Utc>>,
            _expire_on: Option<DateTime<Utc>>,
        ) -> Result<Uuid, QueueError> {
            Ok(Uuid::nil())
        }

        async fn cancel_job(&self, _tracking_id: Uuid) -> Result<(), QueueError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn lookup_is_scoped_to_the_registered_command_type() {
        let registry = QueueRegistry::new();
        registry.register::<Foo>(Arc::new(StubHandle)).await;

        assert!(registry.get::<Foo>().await.is_some());
        assert!(registry.get::<Bar>().await.is_none());
    }
}
