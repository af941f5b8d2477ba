//! Fixed-window time bucketing for rate limit counters.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as seconds since the Unix epoch.
pub fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Index of the fixed window containing `now_secs`.
///
/// Two instants share an index iff they fall in the same
/// `window_secs`-long interval since the epoch.
pub fn window_index(now_secs: u64, window_secs: u64) -> u64 {
    now_secs / window_secs
}

/// Key identifying a rate limit counter: one client in one window.
///
/// Because the window index is part of the key, crossing a window
/// boundary changes the key and the count starts over with no explicit
/// reset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowKey {
    /// The client identity derived from the request.
    pub client: String,
    /// The window index (epoch seconds divided by window length, floored).
    pub window: u64,
}

impl WindowKey {
    /// Create a new window key.
    pub fn new(client: &str, window: u64) -> Self {
        Self {
            client: client.to_string(),
            window,
        }
    }
}

impl std::fmt::Display for WindowKey {
    /// Format: "{client}:{window}". Also used as the storage key string.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.client, self.window)
    }
}

/// A stored request count for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterEntry {
    /// Requests counted so far in this window.
    pub count: u32,
    /// The window index the count belongs to.
    pub window: u64,
}
