//! MCP server handler implementation.
//!
//! This module defines the control-surface handler that
//! routes tool calls to the shared worker.
use std::sync::Arc;

use crate::tools::{
    CacheGetParams, CachePurgeParams, NotificationClickParams, PushParams, SwMessageParams, SyncEnqueueParams,
    SyncParams, cache, message, push, status, sync,
};
use crate::worker::Worker;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP control surface for the offline cache worker.
#[derive(Clone)]
pub struct OffcacheServer {
    worker: Arc<Worker>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl OffcacheServer {
    pub fn new(worker: Arc<Worker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Post a control message to the worker. Supported types: SKIP_WAITING, GET_VERSION (replies with the version), CLEAN_CACHE (deletes every cache, replies with the count)."
    )]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message::message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Report the worker's lifecycle state, version, caches and known clients.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status::status_impl(&self.worker).await
    }

    #[tool(description = "Inspect a stored response by URL or origin path, optionally in a single named cache.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        cache::get_impl(&self.worker, params.0).await
    }

    #[tool(description = "Purge cache entries by age, URL substring, or LRU bound. Defaults to the dynamic cache.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        cache::purge_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a plain-text push payload. Returns the notification that was shown.")]
    async fn push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        push::push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Click a shown notification. 'dismiss' closes it; otherwise an existing client is focused or a new window opened.")]
    async fn notification_click(&self, params: Parameters<NotificationClickParams>) -> Result<CallToolResult, McpError> {
        push::click_impl(&self.worker, params.0).await
    }

    #[tool(description = "Fire a background sync event. 'contact-form-sync' replays every queued form submission.")]
    async fn sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        sync::sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Queue a form submission to be replayed by the next background sync.")]
    async fn sync_enqueue(&self, params: Parameters<SyncEnqueueParams>) -> Result<CallToolResult, McpError> {
        sync::enqueue_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for OffcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::{ScriptedNetwork, test_worker};

    #[tokio::test]
    async fn test_lists_every_tool() {
        let server = OffcacheServer::new(test_worker(ScriptedNetwork::default()).await);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "cache_get",
                "cache_purge",
                "notification_click",
                "push",
                "sw_message",
                "sw_status",
                "sync",
                "sync_enqueue"
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let server = OffcacheServer::new(test_worker(ScriptedNetwork::default()).await);
        assert_eq!(server.get_info().server_info.name, "offcache");
    }
}
