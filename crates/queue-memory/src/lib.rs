//! In-process reference implementations of `queue-core`'s storage and
//! transport contracts.
//!
//! Backed by a `tokio::sync::Mutex`-guarded `Vec`, not an index or a
//! real queue: this crate exists for `queue-core`'s own tests and for
//! local demo runs without a database, not as a production backend.

mod events;
mod jobs;
mod transport;

pub use events::MemoryEventStorage;
pub use jobs::MemoryJobStorage;
pub use transport::MemoryEventTransport;

use thiserror::Error;

/// The error type every in-memory provider in this crate returns.
///
/// There is exactly one variant because nothing in an in-process
/// `Vec`-backed store can actually fail; it exists so the trait
/// contract's associated `Error` type has something concrete to be.
#[derive(Debug, Error, Clone)]
#[error("memory storage is infallible: {0}")]
pub struct MemoryStorageError(pub String);
