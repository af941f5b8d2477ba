//! Redis-backed counter storage.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use tracing::info;

use super::{CounterStore, StoreError};
use crate::ratelimit::{CounterEntry, WindowKey};

const KEY_PREFIX: &str = "ratelimit:";

/// Shared counter store with expiry delegated to Redis.
///
/// Keys embed the window index, values hold the bare count, and every
/// write sets a TTL, so counters vanish on their own and limiter state
/// survives process restarts and is shared across serving instances.
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to the given Redis URL.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        info!("Connecting to Redis counter store");
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Redis counter store connected");
        Ok(Self { conn })
    }

    /// Wrap an existing connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn redis_key(key: &WindowKey) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }
}

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn get(&self, key: &WindowKey) -> Result<Option<CounterEntry>, StoreError> {
        let mut conn = self.conn.clone();
        let count: Option<u32> = conn.get(Self::redis_key(key)).await?;
        Ok(count.map(|count| CounterEntry {
            count,
            window: key.window,
        }))
    }

    async fn put(
        &self,
        key: &WindowKey,
        entry: CounterEntry,
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(Self::redis_key(key))
            .arg(entry.count)
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
