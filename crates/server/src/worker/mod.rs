//! The offline cache worker.
//!
//! A [`Worker`] plays the part of a browser service worker for every page
//! served through the proxy. It moves through the lifecycle
//!
//! ```text
//! Parsed → Installing → Installed → Activating → Activated
//!              ↘ (attempts exhausted) Redundant
//! ```
//!
//! and, once activated, answers every intercepted GET through one of three
//! caching strategies (see [`strategy`]). Side channels (control messages,
//! background sync and push) live in their own modules.
//!
//! Install and activate run to completion before the state changes, so a
//! fetch is never answered as "activated" while old caches still exist.

pub mod clients;
pub mod message;
pub mod notify;
pub mod served;
pub mod strategy;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use futures::future::try_join_all;
use offcache_client::{FetchRequest, Method, Network, Url, resolve_on_origin};
use offcache_core::classify::accepts_html;
use offcache_core::{AppConfig, CacheDb, Error, FormQueue, classify};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;

pub use clients::{ClientInfo, Clients};
pub use notify::{ClientAction, LogNotifier, Notifier};
pub use served::{Served, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// The offline cache worker.
pub struct Worker {
    config: AppConfig,
    origin: Url,
    caches: CacheDb,
    network: Arc<dyn Network>,
    queue: Arc<dyn FormQueue>,
    notifier: Arc<dyn Notifier>,
    clients: Clients,
    state: watch::Sender<LifecycleState>,
    skip_waiting: watch::Sender<bool>,
    revalidations: TaskTracker,
}

impl Worker {
    pub fn new(
        config: AppConfig, caches: CacheDb, network: Arc<dyn Network>, queue: Arc<dyn FormQueue>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, Error> {
        let origin = offcache_client::canonicalize(&config.origin_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        Ok(Self {
            config,
            origin,
            caches,
            network,
            queue,
            notifier,
            clients: Clients::default(),
            state: watch::channel(LifecycleState::Parsed).0,
            skip_waiting: watch::channel(false).0,
            revalidations: TaskTracker::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn caches(&self) -> &CacheDb {
        &self.caches
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Whether the worker currently intercepts traffic.
    pub fn is_controlling(&self) -> bool {
        self.state() == LifecycleState::Activated
    }

    /// The version string reported to `GET_VERSION`.
    pub fn version(&self) -> &str {
        &self.config.static_cache_name
    }

    /// Resolve a path (or absolute origin URL) to the URL used as cache key.
    ///
    /// Absolute URLs must share the origin's scheme, host and port.
    pub fn resolve(&self, target: &str) -> Result<Url, Error> {
        if let Ok(url) = Url::parse(target) {
            if url.origin() != self.origin.origin() {
                return Err(Error::InvalidUrl(format!("{url} is not on {}", self.origin.origin().ascii_serialization())));
            }
            return Ok(url);
        }
        resolve_on_origin(&self.origin, target).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    fn set_state(&self, state: LifecycleState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::info!(from = ?previous, to = ?state, "worker lifecycle");
        }
    }

    /// Ask for activation as soon as install has finished.
    pub fn skip_waiting(&self) {
        self.skip_waiting.send_replace(true);
    }

    /// Install: fetch the whole precache manifest and store it as one batch.
    ///
    /// If any manifest URL fails to fetch or answers with a non-OK status,
    /// nothing is written and the worker stays uninstalled.
    pub async fn install(&self) -> Result<(), Error> {
        self.set_state(LifecycleState::Installing);

        match self.precache().await {
            Ok(count) => {
                tracing::info!(cache = %self.config.static_cache_name, count, "precache complete");
                self.set_state(LifecycleState::Installed);
                self.skip_waiting();
                Ok(())
            }
            Err(e) => {
                self.set_state(LifecycleState::Parsed);
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize, Error> {
        let urls = self
            .config
            .precache
            .iter()
            .map(|path| self.resolve(path))
            .collect::<Result<Vec<_>, _>>()?;

        let responses = try_join_all(urls.into_iter().map(|url| async move {
            let request = FetchRequest::get(url.clone());
            let response = self
                .network
                .fetch(request)
                .await
                .map_err(|e| Error::CacheWrite(format!("{url}: {e}")))?;
            if !response.is_cacheable() {
                return Err(Error::CacheWrite(format!("{url}: status {}", response.status.as_u16())));
            }
            Ok(response.to_cached())
        }))
        .await?;

        let count = responses.len();
        self.caches.open_cache(&self.config.static_cache_name).await?;
        self.caches
            .put_entries(&self.config.static_cache_name, responses)
            .await
            .map_err(|e| Error::CacheWrite(e.to_string()))?;
        Ok(count)
    }

    /// Activate: delete every cache that is not current, then claim clients.
    pub async fn activate(&self) -> Result<(), Error> {
        self.set_state(LifecycleState::Activating);

        if let Err(e) = self.collect_stale_caches().await {
            self.set_state(LifecycleState::Installed);
            return Err(e);
        }

        let claimed = self.clients.claim().await;
        tracing::debug!(claimed, "clients claimed");
        self.set_state(LifecycleState::Activated);
        Ok(())
    }

    async fn collect_stale_caches(&self) -> Result<(), Error> {
        let current = [&self.config.static_cache_name, &self.config.dynamic_cache_name];
        for name in self.caches.cache_names().await? {
            if !current.contains(&&name) {
                self.caches.delete_cache(&name).await?;
                tracing::info!(cache = %name, "deleted stale cache");
            }
        }
        self.caches.open_cache(&self.config.dynamic_cache_name).await?;

        if let Some(max_age) = self.config.dynamic_max_age() {
            let purged = self
                .caches
                .purge_expired_entries(&self.config.dynamic_cache_name, max_age)
                .await?;
            if purged > 0 {
                tracing::info!(purged, "purged expired dynamic entries");
            }
        }
        Ok(())
    }

    /// Drive the lifecycle to `Activated`.
    ///
    /// Install is retried up to `install_max_attempts` times; once those are
    /// used up the worker becomes redundant and the last error is returned.
    pub async fn start(&self) -> Result<(), Error> {
        let max_attempts = self.config.install_max_attempts;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.install().await {
                Ok(()) => break,
                Err(e) if attempt < max_attempts => {
                    tracing::warn!(attempt, max_attempts, error = %e, "install failed; retrying");
                    tokio::time::sleep(self.config.install_retry_delay()).await;
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "install failed; giving up");
                    self.set_state(LifecycleState::Redundant);
                    return Err(e);
                }
            }
        }

        let mut skip = self.skip_waiting.subscribe();
        let _ = skip.wait_for(|skip| *skip).await;

        self.activate().await
    }

    /// Answer an intercepted request.
    ///
    /// GETs received while the worker controls traffic always produce a
    /// response. Everything else is passed to the network unmodified, and
    /// only those pass-through requests can fail.
    pub async fn handle_fetch(&self, request: FetchRequest) -> Result<Served, Error> {
        if request.method != Method::GET {
            return self.passthrough(request).await;
        }

        let accept = request.accept().map(str::to_string);
        if accepts_html(accept.as_deref()) {
            self.clients.register(request.url.as_str()).await;
        }

        if !self.is_controlling() {
            return self.passthrough(request).await;
        }

        let class = classify(&request.url, accept.as_deref());
        let strategy = class.strategy();
        tracing::debug!(url = %request.url, ?class, ?strategy, "intercepted");

        Ok(self.apply(strategy, request).await)
    }

    async fn passthrough(&self, request: FetchRequest) -> Result<Served, Error> {
        let response = self.network.fetch(request).await?;
        Ok(Served::from_network(response, Source::Passthrough))
    }

    /// Wait for in-flight background revalidations.
    pub async fn settle(&self) {
        self.revalidations.close();
        self.revalidations.wait().await;
        self.revalidations.reopen();
    }

    fn root_url(&self) -> Url {
        let mut root = self.origin.clone();
        root.set_path("/");
        root.set_query(None);
        root
    }
}
