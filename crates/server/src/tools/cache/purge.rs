//! cache_purge tool implementation.
//!
//! Purges entries from one cache (the dynamic cache by default) by age,
//! URL pattern, or count.

use std::time::Duration;

use offcache_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::worker::Worker;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Cache to purge (default: the dynamic cache).
    #[serde(default)]
    pub cache: Option<String>,

    /// Purge entries stored more than this many seconds ago.
    #[serde(default)]
    pub older_than_secs: Option<u64>,

    /// Purge entries whose URL contains this substring.
    #[serde(default)]
    pub url_pattern: Option<String>,

    /// Keep only the N most recently used entries (LRU purge).
    #[serde(default)]
    pub max_entries: Option<usize>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    pub cache: String,
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(worker: &Worker, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.older_than_secs.is_none() && params.url_pattern.is_none() && params.max_entries.is_none() {
        return Err(Error::InvalidInput(
            "At least one of older_than_secs, url_pattern, or max_entries must be specified".to_string(),
        )
        .into());
    }
    if params.url_pattern.as_deref().is_some_and(str::is_empty) {
        return Err(Error::InvalidInput("url_pattern must not be empty".to_string()).into());
    }

    let cache = params
        .cache
        .unwrap_or_else(|| worker.config().dynamic_cache_name.clone());
    let caches = worker.caches();
    let mut deleted_total = 0u64;

    if let Some(secs) = params.older_than_secs {
        deleted_total += caches.purge_expired_entries(&cache, Duration::from_secs(secs)).await?;
    }

    if let Some(pattern) = params.url_pattern {
        deleted_total += caches.purge_entries_matching(&cache, &pattern).await?;
    }

    if let Some(max_entries) = params.max_entries {
        deleted_total += caches.trim_cache(&cache, max_entries).await?;
    }

    tracing::info!(cache = %cache, deleted = deleted_total, "cache purged");

    let output = CachePurgeOutput { cache, deleted: deleted_total };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tool_text;
    use crate::worker::testing::{ScriptedNetwork, activated_worker};
    use offcache_core::CachedResponse;

    fn entry(url: &str) -> CachedResponse {
        CachedResponse::new(url, 200, vec![], b"{}".to_vec())
    }

    fn params() -> CachePurgeParams {
        CachePurgeParams { cache: None, older_than_secs: None, url_pattern: None, max_entries: None }
    }

    #[tokio::test]
    async fn test_purge_by_pattern() {
        let worker = activated_worker(ScriptedNetwork::with_site()).await;
        let dynamic = worker.config().dynamic_cache_name.clone();
        worker.caches().put_entry(&dynamic, &entry("https://example.com/api/leads")).await.unwrap();
        worker.caches().put_entry(&dynamic, &entry("https://example.com/about")).await.unwrap();

        let params = CachePurgeParams { url_pattern: Some("/api/".to_string()), ..params() };

        let result = purge_impl(&worker, params).await.unwrap();
        let output: CachePurgeOutput = serde_json::from_str(&tool_text(&result)).unwrap();
        assert_eq!(output.deleted, 1);
        assert_eq!(output.cache, dynamic);
        assert_eq!(worker.caches().entry_count(&dynamic).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_lru() {
        let worker = activated_worker(ScriptedNetwork::with_site()).await;
        let static_name = worker.config().static_cache_name.clone();

        let params = CachePurgeParams { cache: Some(static_name.clone()), max_entries: Some(1), ..params() };

        let result = purge_impl(&worker, params).await.unwrap();
        let output: CachePurgeOutput = serde_json::from_str(&tool_text(&result)).unwrap();
        assert_eq!(output.deleted, 2);
        assert_eq!(worker.caches().entry_count(&static_name).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_older_than_keeps_fresh_entries() {
        let worker = activated_worker(ScriptedNetwork::with_site()).await;
        let static_name = worker.config().static_cache_name.clone();

        let params = CachePurgeParams { cache: Some(static_name.clone()), older_than_secs: Some(3600), ..params() };

        let result = purge_impl(&worker, params).await.unwrap();
        let output: CachePurgeOutput = serde_json::from_str(&tool_text(&result)).unwrap();
        assert_eq!(output.deleted, 0);
        assert_eq!(worker.caches().entry_count(&static_name).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_purge_no_params() {
        let worker = activated_worker(ScriptedNetwork::with_site()).await;

        let result = purge_impl(&worker, params()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invalid_pattern_deletes_nothing() {
        let worker = activated_worker(ScriptedNetwork::with_site()).await;
        let static_name = worker.config().static_cache_name.clone();

        let params = CachePurgeParams {
            cache: Some(static_name.clone()),
            older_than_secs: Some(0),
            url_pattern: Some(String::new()),
            max_entries: Some(0),
        };

        let err = purge_impl(&worker, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
        assert_eq!(worker.caches().entry_count(&static_name).await.unwrap(), 3);
    }
}
