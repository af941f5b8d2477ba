//! In-process counter storage.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use super::{CounterStore, StoreError};
use crate::ratelimit::{epoch_seconds, CounterEntry, WindowKey};

/// Process-local counter store.
///
/// Counters live only as long as the serving process; a restart silently
/// resets all quotas. There is no background scheduler, so expired entries
/// are evicted opportunistically: whenever a write pushes the map past
/// `max_entries`, the writing request sweeps out everything already
/// expired. This bounds memory growth with distinct client identities.
pub struct MemoryStore {
    entries: DashMap<WindowKey, StoredEntry>,
    max_entries: usize,
    /// Held by whichever request is sweeping; others skip instead of queueing.
    sweep: Mutex<()>,
}

#[derive(Debug, Clone, Copy)]
struct StoredEntry {
    entry: CounterEntry,
    expires_at: u64,
}

impl MemoryStore {
    /// Create a new store that sweeps once it holds more than
    /// `max_entries` counters.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            sweep: Mutex::new(()),
        }
    }

    /// Number of counters currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no counters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sweep_expired(&self, now: u64) {
        let Some(_guard) = self.sweep.try_lock() else {
            return;
        };
        let before = self.entries.len();
        self.entries.retain(|_, stored| stored.expires_at > now);
        debug!(
            removed = before.saturating_sub(self.entries.len()),
            remaining = self.entries.len(),
            "Swept expired rate limit counters"
        );
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get(&self, key: &WindowKey) -> Result<Option<CounterEntry>, StoreError> {
        let now = epoch_seconds();
        Ok(self
            .entries
            .get(key)
            .filter(|stored| stored.expires_at > now)
            .map(|stored| stored.entry))
    }

    async fn put(
        &self,
        key: &WindowKey,
        entry: CounterEntry,
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        let now = epoch_seconds();
        self.entries.insert(
            key.clone(),
            StoredEntry {
                entry,
                expires_at: now.saturating_add(ttl_secs),
            },
        );
        if self.entries.len() > self.max_entries {
            self.sweep_expired(now);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(count: u32, window: u64) -> CounterEntry {
        CounterEntry { count, window }
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let store = MemoryStore::new(500);
        let key = WindowKey::new("1.2.3.4", 472222);

        store.put(&key, entry(7, 472222), 3600).await.unwrap();

        let got = store.get(&key).await.unwrap().unwrap();
        assert_eq!(got.count, 7);
        assert_eq!(got.window, 472222);
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let store = MemoryStore::new(500);
        let key = WindowKey::new("1.2.3.4", 472222);

        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_not_returned() {
        let store = MemoryStore::new(500);
        let key = WindowKey::new("1.2.3.4", 472222);

        // Zero TTL expires immediately.
        store.put(&key, entry(3, 472222), 0).await.unwrap();

        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = MemoryStore::new(500);
        let a = WindowKey::new("1.2.3.4", 472222);
        let b = WindowKey::new("5.6.7.8", 472222);

        store.put(&a, entry(5, 472222), 3600).await.unwrap();
        store.put(&b, entry(1, 472222), 3600).await.unwrap();

        assert_eq!(store.get(&a).await.unwrap().unwrap().count, 5);
        assert_eq!(store.get(&b).await.unwrap().unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_sweep_evicts_expired_entries() {
        let store = MemoryStore::new(4);

        // Fill past the ceiling with already-expired counters.
        for i in 0..5 {
            let key = WindowKey::new(&format!("10.0.0.{}", i), 1);
            store.put(&key, entry(1, 1), 0).await.unwrap();
        }

        // The write that observed the oversized map swept the expired ones,
        // leaving at most itself behind.
        assert!(store.len() <= 1, "store still holds {} entries", store.len());
    }

    #[tokio::test]
    async fn test_sweep_keeps_live_entries() {
        let store = MemoryStore::new(2);
        let live = WindowKey::new("1.2.3.4", 472222);
        store.put(&live, entry(9, 472222), 3600).await.unwrap();

        for i in 0..3 {
            let key = WindowKey::new(&format!("10.0.0.{}", i), 1);
            store.put(&key, entry(1, 1), 0).await.unwrap();
        }

        let got = store.get(&live).await.unwrap().unwrap();
        assert_eq!(got.count, 9);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_count() {
        let store = MemoryStore::new(500);
        let key = WindowKey::new("1.2.3.4", 472222);

        store.put(&key, entry(1, 472222), 3600).await.unwrap();
        store.put(&key, entry(2, 472222), 3600).await.unwrap();

        assert_eq!(store.get(&key).await.unwrap().unwrap().count, 2);
        assert_eq!(store.len(), 1);
    }
}
