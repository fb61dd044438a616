//! Test doubles for the worker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use offcache_client::header::{self, HeaderMap, HeaderValue};
use offcache_client::{FetchRequest, FetchResponse, Network, StatusCode};
use offcache_core::{AppConfig, CacheDb, Error};

use super::{LogNotifier, Worker};

#[derive(Default)]
struct Script {
    routes: HashMap<String, (u16, Bytes)>,
    offline: bool,
    fail_next: usize,
    calls: HashMap<String, usize>,
    requests: Vec<FetchRequest>,
}

/// A network answering from a routing table keyed by path.
///
/// Unscripted paths answer 404. Clones share state.
#[derive(Clone, Default)]
pub(crate) struct ScriptedNetwork {
    script: Arc<Mutex<Script>>,
}

impl ScriptedNetwork {
    /// Scripts the three precached paths used by [`test_worker`].
    pub(crate) fn with_site() -> Self {
        let network = Self::default();
        network.respond("/", 200, "<html>home</html>");
        network.respond("/css/styles.css", 200, "body{color:red}");
        network.respond("/js/main.js", 200, "console.log('hi')");
        network
    }

    pub(crate) fn respond(&self, path: &str, status: u16, body: &str) {
        let mut script = self.script.lock().unwrap();
        script.routes.insert(path.to_string(), (status, Bytes::copy_from_slice(body.as_bytes())));
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.script.lock().unwrap().offline = !online;
    }

    /// Fail the next `n` fetches with a transport error.
    pub(crate) fn fail_next(&self, n: usize) {
        self.script.lock().unwrap().fail_next = n;
    }

    /// How many fetches reached `path`, failed ones included.
    pub(crate) fn calls(&self, path: &str) -> usize {
        self.script.lock().unwrap().calls.get(path).copied().unwrap_or(0)
    }

    pub(crate) fn requests(&self) -> Vec<FetchRequest> {
        self.script.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, Error> {
        let mut script = self.script.lock().unwrap();
        let path = request.url.path().to_string();
        *script.calls.entry(path.clone()).or_default() += 1;
        script.requests.push(request.clone());

        if script.offline {
            return Err(Error::Network(format!("{} unreachable", request.url)));
        }
        if script.fail_next > 0 {
            script.fail_next -= 1;
            return Err(Error::Network(format!("{} reset", request.url)));
        }

        let (status, bytes) = script
            .routes
            .get(&path)
            .cloned()
            .unwrap_or((404, Bytes::from_static(b"not found")));

        let mut headers = HeaderMap::new();
        let content_type = if path == "/" { "text/html" } else { "text/plain" };
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));

        Ok(FetchResponse { url: request.url, status: StatusCode::from_u16(status).unwrap(), bytes, headers })
    }
}

pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        origin_url: "https://example.com".into(),
        precache: vec!["/".into(), "/css/styles.css".into(), "/js/main.js".into()],
        dynamic_max_entries: 2,
        install_retry_ms: 10,
        ..Default::default()
    }
}

/// A worker over an in-memory cache that has not been started.
pub(crate) async fn test_worker(network: ScriptedNetwork) -> Arc<Worker> {
    test_worker_with_notifier(network).await.0
}

pub(crate) async fn test_worker_with_notifier(network: ScriptedNetwork) -> (Arc<Worker>, Arc<LogNotifier>) {
    worker_with(test_config(), Arc::new(network)).await
}

/// A worker over an in-memory cache with any config and network.
pub(crate) async fn worker_with(config: AppConfig, network: Arc<dyn Network>) -> (Arc<Worker>, Arc<LogNotifier>) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let notifier = Arc::new(LogNotifier::default());
    let worker = Worker::new(config, db.clone(), network, Arc::new(db), notifier.clone()).unwrap();
    (Arc::new(worker), notifier)
}

/// A worker that has precached [`ScriptedNetwork::with_site`] and activated.
pub(crate) async fn activated_worker(network: ScriptedNetwork) -> Arc<Worker> {
    let worker = test_worker(network).await;
    worker.start().await.unwrap();
    worker
}
