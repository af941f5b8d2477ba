//! Counter storage backends.

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::ratelimit::{CounterEntry, WindowKey};

/// Errors that can occur in counter storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or the operation failed.
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// Trait for counter storage backends.
///
/// This abstracts over the in-process `MemoryStore` and the shared
/// `RedisStore` so the limiter can work with either. Backends implement
/// exactly this get/put pair; the fixed-window arithmetic stays in the
/// limiter.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Fetch the entry stored under `key`, if present and not expired.
    async fn get(&self, key: &WindowKey) -> Result<Option<CounterEntry>, StoreError>;

    /// Store `entry` under `key`, discarding it after `ttl_secs`.
    async fn put(
        &self,
        key: &WindowKey,
        entry: CounterEntry,
        ttl_secs: u64,
    ) -> Result<(), StoreError>;
}
