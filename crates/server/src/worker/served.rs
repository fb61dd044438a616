//! Responses produced by the worker.

use bytes::Bytes;
use offcache_client::header::{self, HeaderMap, HeaderName, HeaderValue};
use offcache_client::{FetchResponse, StatusCode};
use offcache_core::CachedResponse;
use serde::Serialize;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Live network response chosen by a strategy.
    Network,
    /// Stored entry from one of the caches.
    Cache,
    /// Synthesized offline payload.
    Offline,
    /// Request the worker did not intercept.
    Passthrough,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Network => "network",
            Source::Cache => "cache",
            Source::Offline => "offline",
            Source::Passthrough => "passthrough",
        }
    }
}

/// A response handed back to the intercepted request.
#[derive(Debug, Clone)]
pub struct Served {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: Source,
}

impl Served {
    pub fn from_network(response: FetchResponse, source: Source) -> Self {
        Self { status: response.status, headers: response.headers, body: response.bytes, source }
    }

    pub fn from_cache(entry: CachedResponse) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in &entry.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }
        let status = StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK);
        Self { status, headers, body: Bytes::from(entry.body), source: Source::Cache }
    }

    /// The 503 JSON payload returned when neither cache nor network can answer.
    pub fn offline(message: &str) -> Self {
        let body = serde_json::json!({ "error": "Offline", "message": message });
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            headers,
            body: Bytes::from(body.to_string()),
            source: Source::Offline,
        }
    }
}
