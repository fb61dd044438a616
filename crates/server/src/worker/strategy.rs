//! Caching strategies.
//!
//! ### Cache-first (static assets)
//! Any cache hit is returned. On a miss the network answer is returned and,
//! if OK and complete, copied into the static cache. Partial content (206)
//! is passed through but never stored.
//!
//! ### Network-first (API and everything unclassified)
//! The network answer is returned whatever its status; OK answers are copied
//! into the dynamic cache. Only when the network is unreachable does the
//! dynamic cache answer.
//!
//! ### Stale-while-revalidate (HTML)
//! A dynamic-cache hit is returned immediately while a tracked background
//! fetch refreshes the entry. Without a hit the refresh is awaited.
//!
//! Every strategy ends in the offline fallback instead of failing. Cache
//! read or write errors are logged and treated as a miss.

use offcache_client::{FetchRequest, FetchResponse, Network};
use offcache_core::classify::accepts_html;
use offcache_core::{CacheDb, CachedResponse, Strategy};
use std::sync::Arc;

use super::{Served, Source, Worker};

/// Copy a cacheable response into `cache`, trimming to `bound` entries if given.
async fn store(caches: &CacheDb, cache: &str, bound: Option<usize>, response: &FetchResponse) {
    if !response.is_cacheable() {
        return;
    }

    if let Err(e) = caches.put_entry(cache, &response.to_cached()).await {
        tracing::warn!(cache, url = %response.url, error = %e, "cache write failed");
        return;
    }

    if let Some(max_entries) = bound {
        match caches.trim_cache(cache, max_entries).await {
            Ok(0) => {}
            Ok(evicted) => tracing::debug!(cache, evicted, "cache trimmed"),
            Err(e) => tracing::warn!(cache, error = %e, "cache trim failed"),
        }
    }
}

/// Fetch and, on success, refresh the dynamic cache.
async fn revalidate(
    network: Arc<dyn Network>, caches: CacheDb, cache: String, bound: usize, request: FetchRequest,
) -> Option<FetchResponse> {
    match network.fetch(request).await {
        Ok(response) => {
            store(&caches, &cache, Some(bound), &response).await;
            Some(response)
        }
        Err(e) => {
            tracing::debug!(error = %e, "revalidation failed");
            None
        }
    }
}

impl Worker {
    pub(super) async fn apply(&self, strategy: Strategy, request: FetchRequest) -> Served {
        match strategy {
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    async fn lookup(&self, cache: Option<&str>, url: &str) -> Option<CachedResponse> {
        let result = match cache {
            Some(cache) => self.caches.match_entry(cache, url).await,
            None => self.caches.match_any(url).await,
        };
        match result {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url, error = %e, "cache read failed");
                None
            }
        }
    }

    pub(super) async fn cache_first(&self, request: FetchRequest) -> Served {
        if let Some(hit) = self.lookup(None, request.url.as_str()).await {
            tracing::debug!(url = %request.url, "cache hit");
            return Served::from_cache(hit);
        }

        match self.network.fetch(request.clone()).await {
            Ok(response) => {
                store(&self.caches, &self.config.static_cache_name, None, &response).await;
                Served::from_network(response, Source::Network)
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network unavailable");
                self.offline_fallback(&request).await
            }
        }
    }

    pub(super) async fn network_first(&self, request: FetchRequest) -> Served {
        let dynamic = &self.config.dynamic_cache_name;
        match self.network.fetch(request.clone()).await {
            Ok(response) => {
                store(&self.caches, dynamic, Some(self.config.dynamic_max_entries), &response).await;
                Served::from_network(response, Source::Network)
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network unavailable; trying cache");
                match self.lookup(Some(dynamic), request.url.as_str()).await {
                    Some(hit) => Served::from_cache(hit),
                    None => self.offline_fallback(&request).await,
                }
            }
        }
    }

    pub(super) async fn stale_while_revalidate(&self, request: FetchRequest) -> Served {
        let dynamic = self.config.dynamic_cache_name.clone();
        let cached = self.lookup(Some(&dynamic), request.url.as_str()).await;

        let refresh = self.revalidations.spawn(revalidate(
            Arc::clone(&self.network),
            self.caches.clone(),
            dynamic,
            self.config.dynamic_max_entries,
            request.clone(),
        ));

        if let Some(hit) = cached {
            tracing::debug!(url = %request.url, "serving stale; revalidating");
            return Served::from_cache(hit);
        }

        match refresh.await {
            Ok(Some(response)) => Served::from_network(response, Source::Network),
            Ok(None) => self.offline_fallback(&request).await,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "revalidation task failed");
                self.offline_fallback(&request).await
            }
        }
    }

    /// The cached root document for HTML requests, else the 503 JSON payload.
    pub(super) async fn offline_fallback(&self, request: &FetchRequest) -> Served {
        if accepts_html(request.accept())
            && let Some(root) = self.lookup(None, self.root_url().as_str()).await
        {
            return Served::from_cache(root);
        }
        Served::offline(&self.config.offline_message)
    }
}
