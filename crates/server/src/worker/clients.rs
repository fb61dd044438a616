//! Pages the worker knows about.
//!
//! A client is registered the first time an HTML navigation for its URL
//! passes through the proxy. Activation claims every known client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct ClientInfo {
    pub id: u64,
    pub url: String,
    /// Whether the active worker controls this page.
    pub controlled: bool,
    pub focused: bool,
}

/// Most clients remembered at once.
pub const MAX_CLIENTS: usize = 64;

#[derive(Debug)]
struct Tracked {
    info: ClientInfo,
    last_seen: u64,
}

/// Registry of known clients keyed by URL.
///
/// Holds at most `capacity` clients; registering past that forgets the one
/// seen least recently.
#[derive(Debug)]
pub struct Clients {
    by_url: RwLock<HashMap<String, Tracked>>,
    capacity: usize,
    next_id: AtomicU64,
    clock: AtomicU64,
}

impl Default for Clients {
    fn default() -> Self {
        Self::with_capacity(MAX_CLIENTS)
    }
}

impl Clients {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_url: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            next_id: AtomicU64::new(0),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Register a client at `url`, returning its id. Known URLs keep their id.
    pub async fn register(&self, url: &str) -> u64 {
        let seen = self.tick();
        let mut clients = self.by_url.write().await;
        if let Some(client) = clients.get_mut(url) {
            client.last_seen = seen;
            return client.info.id;
        }

        while clients.len() >= self.capacity {
            let Some(oldest) = clients
                .iter()
                .min_by_key(|(_, c)| c.last_seen)
                .map(|(url, _)| url.clone())
            else {
                break;
            };
            clients.remove(&oldest);
            tracing::debug!(url = %oldest, "client forgotten");
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        clients.insert(
            url.to_string(),
            Tracked {
                info: ClientInfo { id, url: url.to_string(), controlled: false, focused: false },
                last_seen: seen,
            },
        );
        tracing::debug!(id, url, "client registered");
        id
    }

    /// Take control of every known client. Returns how many were newly claimed.
    pub async fn claim(&self) -> usize {
        let mut clients = self.by_url.write().await;
        let mut claimed = 0;
        for client in clients.values_mut().filter(|c| !c.info.controlled) {
            client.info.controlled = true;
            claimed += 1;
        }
        claimed
    }

    /// Focus the client at `url`, if one exists. Every other client loses focus.
    pub async fn focus(&self, url: &str) -> Option<ClientInfo> {
        let seen = self.tick();
        let mut clients = self.by_url.write().await;
        if !clients.contains_key(url) {
            return None;
        }
        for client in clients.values_mut() {
            client.info.focused = client.info.url == url;
        }
        let client = clients.get_mut(url)?;
        client.last_seen = seen;
        Some(client.info.clone())
    }

    pub async fn all(&self) -> Vec<ClientInfo> {
        let clients = self.by_url.read().await;
        let mut all: Vec<_> = clients.values().map(|c| c.info.clone()).collect();
        all.sort_by_key(|c| c.id);
        all
    }
}
