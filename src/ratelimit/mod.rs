//! Rate limiting logic and request classification.

mod classifier;
mod limiter;
mod window;

pub use classifier::{Classification, RequestClassifier, UNKNOWN_CLIENT};
pub use limiter::{RateLimiter, Verdict};
pub use window::{epoch_seconds, CounterEntry, WindowKey};
