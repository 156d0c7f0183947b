//! Stable 128-bit identifiers derived from names, not generated.
//!
//! A queue or subscriber must resolve to the same identifier across
//! process restarts and across every binary that enqueues into it, so
//! identity is derived from a name rather than assigned at creation.

use crate::command::Command;

fn stable_hash(input: &str) -> u128 {
    let digest = blake3::hash(input.as_bytes());
    let bytes = digest.as_bytes();
    u128::from_le_bytes(bytes[..16].try_into().expect("16 bytes"))
}

/// The identity of the queue that holds every job for command type `C`.
pub fn queue_id_for<C: Command>() -> u128 {
    stable_hash(C::TYPE_NAME)
}

/// The identity of a subscriber, derived from what distinguishes it:
/// the host application, the handler it runs, and the channel it
/// listens on.
pub fn subscriber_id(host_identity: &str, handler_type: &str, channel_target: &str) -> u128 {
    stable_hash(&format!("{host_identity}|{handler_type}|{channel_target}"))
}
