//! Request classification.
//!
//! Every intercepted GET is sorted into a [`RequestClass`] from the shape of
//! its URL and `Accept` header. The class picks the caching [`Strategy`].
//! Rules are checked in order and the first match wins:
//!
//! 1. static asset (by file extension) → cache-first
//! 2. API call (`/api/`, `api.` host, `/webhook/`) → network-first
//! 3. HTML (`Accept: text/html`) → stale-while-revalidate
//! 4. anything else → network-first

use serde::{Deserialize, Serialize};
use url::Url;

/// File extensions served cache-first.
pub const STATIC_EXTENSIONS: &[&str] = &[
    ".css", ".js", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".woff", ".woff2",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    StaticAsset,
    Api,
    Html,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

impl RequestClass {
    pub fn strategy(self) -> Strategy {
        match self {
            RequestClass::StaticAsset => Strategy::CacheFirst,
            RequestClass::Api | RequestClass::Other => Strategy::NetworkFirst,
            RequestClass::Html => Strategy::StaleWhileRevalidate,
        }
    }
}

/// Whether an `Accept` header value asks for an HTML document.
pub fn accepts_html(accept: Option<&str>) -> bool {
    accept.is_some_and(|a| a.contains("text/html"))
}

/// Classify a request by URL and `Accept` header.
pub fn classify(url: &Url, accept: Option<&str>) -> RequestClass {
    let path = url.path().to_ascii_lowercase();

    if STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return RequestClass::StaticAsset;
    }

    let api_host = url.host_str().is_some_and(|h| h.contains("api."));
    if path.contains("/api/") || api_host || path.contains("/webhook/") {
        return RequestClass::Api;
    }

    if accepts_html(accept) {
        return RequestClass::Html;
    }

    RequestClass::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_static_extensions() {
        for path in [
            "/css/styles.css",
            "/js/main.js",
            "/img/logo.png",
            "/img/a.jpg",
            "/img/a.jpeg",
            "/img/a.gif",
            "/img/a.svg",
            "/favicon.ico",
            "/fonts/inter.woff",
            "/fonts/inter.woff2",
        ] {
            let class = classify(&url(&format!("https://example.com{path}")), None);
            assert_eq!(class, RequestClass::StaticAsset, "{path}");
        }
    }

    #[test]
    fn test_static_ignores_query() {
        let class = classify(&url("https://example.com/js/main.js?v=3"), None);
        assert_eq!(class, RequestClass::StaticAsset);
    }

    #[test]
    fn test_static_extension_case_insensitive() {
        assert_eq!(classify(&url("https://example.com/IMG/LOGO.PNG"), None), RequestClass::StaticAsset);
    }

    #[test]
    fn test_static_wins_over_api() {
        let class = classify(&url("https://example.com/api/widget.js"), Some("text/html"));
        assert_eq!(class, RequestClass::StaticAsset);
    }

    #[test]
    fn test_api_paths_and_hosts() {
        assert_eq!(classify(&url("https://example.com/api/leads"), None), RequestClass::Api);
        assert_eq!(classify(&url("https://api.example.com/leads"), None), RequestClass::Api);
        assert_eq!(classify(&url("https://example.com/webhook/stripe"), None), RequestClass::Api);
    }

    #[test]
    fn test_api_wins_over_html() {
        let class = classify(&url("https://example.com/api/leads"), Some("text/html,application/xhtml+xml"));
        assert_eq!(class, RequestClass::Api);
    }

    #[test]
    fn test_html_by_accept() {
        let class = classify(&url("https://example.com/pricing"), Some("text/html,application/xhtml+xml;q=0.9"));
        assert_eq!(class, RequestClass::Html);
    }

    #[test]
    fn test_other() {
        assert_eq!(classify(&url("https://example.com/manifest.json"), None), RequestClass::Other);
        assert_eq!(classify(&url("https://example.com/data"), Some("application/json")), RequestClass::Other);
    }

    #[test]
    fn test_strategies() {
        assert_eq!(RequestClass::StaticAsset.strategy(), Strategy::CacheFirst);
        assert_eq!(RequestClass::Api.strategy(), Strategy::NetworkFirst);
        assert_eq!(RequestClass::Html.strategy(), Strategy::StaleWhileRevalidate);
        assert_eq!(RequestClass::Other.strategy(), Strategy::NetworkFirst);
    }
}
