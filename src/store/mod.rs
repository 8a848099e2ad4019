//! Key-value store with TTL writes and a per-key mutual-exclusion primitive.
//!
//! [`CacheLockStore`] is the backend seam. Every component reads and writes
//! shared state only through it; [`with_lock`] builds the lock on top of the
//! atomic `set_if_absent` / `delete_if_equals` pair, so any backend that
//! offers those two operations (an in-process map, or shared infrastructure
//! reachable by every replica) gets the same locking contract.

mod lock;
mod memory;

pub use lock::{with_lock, LockOptions};
pub use memory::{MemoryStore, StoreStats};

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Backend for cached values and lock markers.
#[async_trait]
pub trait CacheLockStore: Send + Sync {
    /// Get a live value. Expired entries are reported as absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key` for `ttl`, replacing any existing entry.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Atomically store `value` only if `key` has no live entry.
    ///
    /// Returns `true` if the value was stored.
    async fn set_if_absent(&self, key: &str, value: String, ttl: Duration) -> Result<bool>;

    /// Atomically delete `key` only if its live value equals `expected`.
    ///
    /// Returns `true` if the entry was deleted.
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool>;
}
