//! Core rate limiter implementation.

use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::config::RateLimitConfig;
use crate::store::CounterStore;

use super::window::{epoch_seconds, window_index, CounterEntry, WindowKey};

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The request is within budget and should proceed.
    Allow,
    /// The request exceeded the budget for the current window.
    Reject {
        /// Seconds the client should wait before retrying. Always the
        /// full window length, a deliberately coarse hint.
        retry_after_secs: u64,
    },
}

impl Verdict {
    pub fn is_allow(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// Fixed-window request counter over an interchangeable store.
///
/// Counters are keyed by client identity and window index, so a new
/// window starts every client at zero without any explicit reset. Any
/// store failure admits the request: this limiter sheds abusive load,
/// it is not an availability gate.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    limit: u32,
    window_secs: u64,
    count_rejected: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            limit: config.limit,
            window_secs: config.window_secs,
            count_rejected: config.count_rejected,
        }
    }

    /// Check the rate limit for a client and record the request.
    pub async fn check(&self, identity: &str) -> Verdict {
        self.check_at(identity, epoch_seconds()).await
    }

    async fn check_at(&self, identity: &str, now_secs: u64) -> Verdict {
        let window = window_index(now_secs, self.window_secs);
        let key = WindowKey::new(identity, window);

        trace!(
            key = %key,
            "Checking rate limit"
        );

        let count = match self.store.get(&key).await {
            // A stale entry under the same key means the window rolled
            // over with this client idle. Start the new window at zero.
            Ok(Some(entry)) if entry.window == window => entry.count,
            Ok(_) => 0,
            Err(e) => {
                warn!(
                    key = %key,
                    error = %e,
                    "Counter lookup failed, admitting request"
                );
                return Verdict::Allow;
            }
        };

        if count >= self.limit {
            debug!(
                key = %key,
                count = count,
                limit = self.limit,
                "Rate limit exceeded"
            );
            if self.count_rejected {
                let entry = CounterEntry {
                    count: count.saturating_add(1),
                    window,
                };
                if let Err(e) = self.store.put(&key, entry, self.window_secs).await {
                    warn!(key = %key, error = %e, "Counter update failed");
                }
            }
            return Verdict::Reject {
                retry_after_secs: self.window_secs,
            };
        }

        let entry = CounterEntry {
            count: count + 1,
            window,
        };
        // Get-then-put is not atomic. Concurrent checks can undercount,
        // which errs on the side of admitting traffic.
        match self.store.put(&key, entry, self.window_secs).await {
            Ok(()) => Verdict::Allow,
            Err(e) => {
                warn!(
                    key = %key,
                    error = %e,
                    "Counter update failed, admitting request"
                );
                Verdict::Allow
            }
        }
    }
}
