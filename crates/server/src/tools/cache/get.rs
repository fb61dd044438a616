//! cache_get tool implementation.
//!
//! Looks up a stored response by URL, in one cache or in all of them.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use offcache_core::Error;

use crate::worker::Worker;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Path on the origin (e.g. "/css/styles.css") or absolute URL.
    pub url: String,

    /// Cache to look in. Searches every cache when omitted.
    #[serde(default)]
    pub cache: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub stored_at: String,
    /// Body size in bytes.
    pub body_len: usize,
    /// Body as text, when it is valid UTF-8.
    pub body_text: Option<String>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &Worker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url must not be empty".to_string()).into());
    }
    let url = worker.resolve(params.url.trim())?;

    let entry = match &params.cache {
        Some(cache) => worker.caches().match_entry(cache, url.as_str()).await?,
        None => worker.caches().match_any(url.as_str()).await?,
    }
    .ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    let output = CacheGetOutput {
        body_len: entry.body.len(),
        body_text: String::from_utf8(entry.body).ok(),
        url: entry.url,
        status: entry.status,
        headers: entry.headers,
        stored_at: entry.stored_at,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
