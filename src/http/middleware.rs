//! Admission middleware applied in front of the origin.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::trace;

use crate::config::FloodgateConfig;
use crate::ratelimit::{RateLimiter, RequestClassifier, Verdict};
use crate::store::CounterStore;

/// Classifier and limiter bundled as shared middleware state.
pub struct Gate {
    classifier: RequestClassifier,
    limiter: RateLimiter,
}

impl Gate {
    pub fn new(config: &FloodgateConfig, store: Arc<dyn CounterStore>) -> Self {
        Self {
            classifier: RequestClassifier::new(&config.rate_limit.client_header, &config.exempt),
            limiter: RateLimiter::new(store, &config.rate_limit),
        }
    }

    /// Classify a request and check its budget.
    ///
    /// Exempt paths resolve without touching counter storage.
    pub async fn inspect(&self, headers: &HeaderMap, path: &str) -> Verdict {
        let classification = self.classifier.classify(headers, path);
        if classification.exempt {
            trace!(path = path, "Path is exempt from rate limiting");
            return Verdict::Allow;
        }
        self.limiter.check(&classification.identity).await
    }
}

/// Axum middleware that rejects over-budget requests with 429.
pub async fn rate_limit_middleware(
    State(gate): State<Arc<Gate>>,
    request: Request,
    next: Next,
) -> Response {
    let verdict = gate
        .inspect(request.headers(), request.uri().path())
        .await;

    match verdict {
        Verdict::Allow => next.run(request).await,
        Verdict::Reject { retry_after_secs } => too_many_requests(retry_after_secs),
    }
}

fn too_many_requests(retry_after_secs: u64) -> Response {
    let body = format!(
        "Too many requests. Try again in {}.",
        retry_after_phrase(retry_after_secs)
    );
    (
        StatusCode::TOO_MANY_REQUESTS,
        [
            (header::RETRY_AFTER, retry_after_secs.to_string()),
            (header::CONTENT_TYPE, "text/plain".to_string()),
        ],
        body,
    )
        .into_response()
}

fn retry_after_phrase(secs: u64) -> String {
    match secs {
        60 => "a minute".to_string(),
        3600 => "an hour".to_string(),
        86400 => "a day".to_string(),
        secs => format!("{} seconds", secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{CounterEntry, WindowKey};
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that counts how often it is touched.
    struct RecordingStore {
        inner: MemoryStore,
        gets: AtomicUsize,
        puts: AtomicUsize,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(1000),
                gets: AtomicUsize::new(0),
                puts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CounterStore for RecordingStore {
        async fn get(&self, key: &WindowKey) -> Result<Option<CounterEntry>, StoreError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key).await
        }

        async fn put(
            &self,
            key: &WindowKey,
            entry: CounterEntry,
            ttl_secs: u64,
        ) -> Result<(), StoreError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.inner.put(key, entry, ttl_secs).await
        }
    }

    fn test_gate(limit: u32) -> (Gate, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore::new());
        let mut config = FloodgateConfig::default();
        config.rate_limit.limit = limit;
        (Gate::new(&config, store.clone()), store)
    }

    fn forwarded(addr: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", addr.parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn test_exempt_path_skips_storage() {
        let (gate, store) = test_gate(1);

        let verdict = gate.inspect(&forwarded("1.2.3.4"), "/assets/logo.png").await;

        assert_eq!(verdict, Verdict::Allow);
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
        assert_eq!(store.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_limited_path_touches_storage() {
        let (gate, store) = test_gate(1);

        let verdict = gate.inspect(&forwarded("1.2.3.4"), "/api/items").await;

        assert_eq!(verdict, Verdict::Allow);
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
        assert_eq!(store.puts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exempt_path_allowed_after_saturation() {
        let (gate, _) = test_gate(1);
        let headers = forwarded("1.2.3.4");

        gate.inspect(&headers, "/api/items").await;
        assert!(!gate.inspect(&headers, "/api/items").await.is_allow());

        assert!(gate.inspect(&headers, "/site.css").await.is_allow());
    }

    #[tokio::test]
    async fn test_too_many_requests_response_shape() {
        let response = too_many_requests(3600);

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            "3600"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Too many requests. Try again in an hour.");
    }

    #[test]
    fn test_retry_after_phrases() {
        assert_eq!(retry_after_phrase(60), "a minute");
        assert_eq!(retry_after_phrase(3600), "an hour");
        assert_eq!(retry_after_phrase(86400), "a day");
        assert_eq!(retry_after_phrase(90), "90 seconds");
    }
}
