//! Origin URL handling.
//!
//! Cache keys are URL strings, so every request is mapped onto the origin
//! through the same canonical form.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("request target must be an absolute path: {0}")]
    RelativeTarget(String),
}

/// Canonicalize a URL string so equal resources produce equal cache keys.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(mut host) = parsed.host_str() {
        let h = host.to_lowercase();
        host = h.as_str();
        parsed
            .set_host(Some(host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Map an intercepted request target (`/path?query`) onto the origin.
///
/// The origin's own path is replaced, not joined, so a target always
/// addresses the same resource regardless of how the origin was written.
pub fn resolve_on_origin(origin: &url::Url, target: &str) -> Result<url::Url, UrlError> {
    if !target.starts_with('/') || target.starts_with("//") {
        return Err(UrlError::RelativeTarget(target.to_string()));
    }

    let mut resolved = origin.join(target).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    resolved.set_fragment(None);
    Ok(resolved)
}
