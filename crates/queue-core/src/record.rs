use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable representation of a single enqueued command invocation.
///
/// The `command` payload is stored as opaque JSON: storage providers
/// never need to know the concrete command type, only the queue it
/// belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub tracking_id: Uuid,
    pub queue_id: u128,
    pub command: serde_json::Value,
    pub execute_after: DateTime<Utc>,
    pub expire_on: DateTime<Utc>,
    pub is_complete: bool,
}

/// Durable representation of a single event delivered to a subscriber.
///
/// `id` exists purely as the completion key for `mark_event_complete`;
/// nothing upstream of storage ever inspects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub subscriber_id: u128,
    pub event_type: String,
    pub event: serde_json::Value,
    pub expire_on: DateTime<Utc>,
    pub is_complete: bool,
}
