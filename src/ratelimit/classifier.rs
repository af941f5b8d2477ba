//! Request classification: who is asking, and does the path count.

use axum::http::HeaderMap;

use crate::config::ExemptConfig;

/// Identity assigned when the client header is absent or unreadable.
///
/// All such requests share one counter, which collapses header-less
/// traffic into a single budget instead of letting it bypass the limit.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolves a request to a client identity and an exemption decision.
pub struct RequestClassifier {
    client_header: String,
    path_prefixes: Vec<String>,
    path_suffixes: Vec<String>,
}

/// Outcome of classifying one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub identity: String,
    pub exempt: bool,
}

impl RequestClassifier {
    pub fn new(client_header: &str, exempt: &ExemptConfig) -> Self {
        Self {
            client_header: client_header.to_ascii_lowercase(),
            path_prefixes: exempt.path_prefixes.clone(),
            path_suffixes: exempt.path_suffixes.clone(),
        }
    }

    pub fn classify(&self, headers: &HeaderMap, path: &str) -> Classification {
        Classification {
            identity: self.client_identity(headers),
            exempt: self.is_exempt(path),
        }
    }

    /// Client identity from the trusted forwarded-address header.
    ///
    /// The header value is used verbatim. Splitting multi-hop forwarded
    /// lists is left to the proxy that sets the header. An empty value
    /// counts as missing.
    fn client_identity(&self, headers: &HeaderMap) -> String {
        headers
            .get(&self.client_header)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }

    /// Static-asset paths are exempt and never touch counter storage.
    fn is_exempt(&self, path: &str) -> bool {
        self.path_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
            || self
                .path_suffixes
                .iter()
                .any(|suffix| path.ends_with(suffix.as_str()))
    }
}
