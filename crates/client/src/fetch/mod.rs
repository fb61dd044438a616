//! Origin fetch pipeline.
//!
//! ### The network seam
//! The worker never calls reqwest directly. It fetches through the
//! [`Network`] trait so strategies can run against a scripted network in
//! tests and against [`FetchClient`] in production.
//!
//! ### Failure model
//! - Any HTTP status is a *response*, including 4xx/5xx.
//! - Transport errors, timeouts and bodies over `max_bytes` are errors;
//!   callers treat every error as "network unavailable".
//!
//! ### Header hygiene
//! Hop-by-hop headers are stripped in both directions. `accept-encoding`
//! is left to reqwest, which decodes gzip/brotli/deflate bodies itself.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, Method, StatusCode, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, resolve_on_origin};

use offcache_core::{CachedResponse, Error};

/// Headers that describe a single connection and must not be forwarded
/// or stored.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
];

/// Remove hop-by-hop headers and headers invalidated by body decoding.
pub fn strip_hop_by_hop(headers: &mut header::HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
    headers.remove(header::ACCEPT_ENCODING);
    headers.remove(header::CONTENT_ENCODING);
    headers.remove(header::CONTENT_LENGTH);
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "offcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "offcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&offcache_core::AppConfig> for FetchConfig {
    fn from(config: &offcache_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// A request to send to the network.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: header::HeaderMap,
    pub body: Bytes,
}

impl FetchRequest {
    /// A bodyless GET with no headers.
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, headers: header::HeaderMap::new(), body: Bytes::new() }
    }

    /// Set a header, replacing any previous value. Invalid values are ignored.
    pub fn with_header(mut self, name: header::HeaderName, value: &str) -> Self {
        if let Ok(value) = header::HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// The `Accept` header, if present and readable.
    pub fn accept(&self) -> Option<&str> {
        self.headers.get(header::ACCEPT).and_then(|v| v.to_str().ok())
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested; cache entries are keyed on it, not on redirects.
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
}

impl FetchResponse {
    /// Whether the status is 2xx.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// Whether this response may be stored as a complete entry.
    ///
    /// Partial content (206) only covers a byte range of the resource.
    pub fn is_cacheable(&self) -> bool {
        self.is_ok() && self.status != StatusCode::PARTIAL_CONTENT
    }

    /// Copy this response into a cache entry stored under the request URL.
    pub fn to_cached(&self) -> CachedResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        CachedResponse::new(self.url.as_str(), self.status.as_u16(), headers, self.bytes.to_vec())
    }
}

/// Anything that can turn a request into a response.
#[async_trait]
pub trait Network: Send + Sync {
    /// Send a request.
    ///
    /// Returns `Err` only when no response could be obtained.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, Error>;
}

/// HTTP fetch client for the origin.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let FetchRequest { method, url, mut headers, body } = request;
        strip_hop_by_hop(&mut headers);

        let mut builder = self.http.request(method.clone(), url.clone()).headers(headers);
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{method} {url}: {e}"))
            } else {
                Error::Network(format!("{method} {url}: {e}"))
            }
        })?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let final_url = response.url().clone();
        let mut headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("reading {url}: {e}"))
            } else {
                Error::Network(format!("failed to read response: {}", e))
            }
        })?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        strip_hop_by_hop(&mut headers);

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "{} {} -> {} {} in {}ms ({} bytes)",
            method,
            url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url, status, bytes, headers })
    }
}
