//! offcache entry point.
//!
//! Boots the worker, serves the HTTP interception layer, and (unless
//! disabled) the MCP control surface on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use offcache_client::{FetchClient, FetchConfig};
use offcache_core::{AppConfig, CONTACT_FORM_SYNC, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod proxy;
mod tools;
mod worker;

use worker::{LogNotifier, Worker};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let caches = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);

    let worker = Arc::new(Worker::new(
        config.clone(),
        caches.clone(),
        network,
        Arc::new(caches),
        Arc::new(LogNotifier::default()),
    )?);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, origin = %worker.origin(), "offcache listening");

    let lifecycle = Arc::clone(&worker);
    tokio::spawn(async move {
        if let Err(e) = lifecycle.start().await {
            tracing::error!(error = %e, "worker failed to start; requests pass through");
        }
    });

    if let Some(interval) = config.sync_interval() {
        let syncer = Arc::clone(&worker);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = syncer.handle_sync(CONTACT_FORM_SYNC).await {
                    tracing::warn!(error = %e, "background sync failed; will retry");
                }
            }
        });
    }

    if config.mcp_stdio {
        let handler = handler::OffcacheServer::new(Arc::clone(&worker));
        tokio::spawn(async move {
            tracing::info!("Starting MCP control surface on stdio transport");
            match serve_server(handler, stdio()).await {
                Ok(server) => {
                    if let Err(e) = server.waiting().await {
                        tracing::error!(error = %e, "MCP server stopped");
                    }
                }
                Err(e) => tracing::error!(error = %e, "MCP server failed to start"),
            }
        });
    }

    let app = proxy::router(Arc::clone(&worker));
    tokio::select! {
        result = axum::serve(listener, app) => result.context("serving HTTP")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }

    worker.settle().await;
    Ok(())
}
