//! sw_message tool implementation.
//!
//! Posts a control message to the worker and returns its reply.

use offcache_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::worker::Worker;

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message object, e.g. {"type": "GET_VERSION"}.
    pub message: Value,
}

/// Output from the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    /// The worker's reply; null for messages without one.
    pub reply: Option<Value>,
}

pub async fn message_impl(worker: &Worker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let reply = worker.handle_message(params.message).await?;

    let json = serde_json::to_string_pretty(&SwMessageOutput { reply })
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize reply: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tool_text;
    use crate::worker::testing::{ScriptedNetwork, activated_worker};
    use serde_json::json;

    async fn post(worker: &Worker, message: Value) -> SwMessageOutput {
        let result = message_impl(worker, SwMessageParams { message }).await.unwrap();
        serde_json::from_str(&tool_text(&result)).unwrap()
    }

    #[tokio::test]
    async fn test_get_version() {
        let worker = activated_worker(ScriptedNetwork::with_site()).await;
        let output = post(&worker, json!({"type": "GET_VERSION"})).await;
        assert_eq!(output.reply, Some(json!({"version": "offcache-static-v1"})));
    }

    #[tokio::test]
    async fn test_clean_cache() {
        let worker = activated_worker(ScriptedNetwork::with_site()).await;
        let output = post(&worker, json!({"type": "CLEAN_CACHE"})).await;
        assert_eq!(output.reply, Some(json!({"deleted": 2})));
    }

    #[tokio::test]
    async fn test_unknown_message() {
        let worker = activated_worker(ScriptedNetwork::with_site()).await;
        let output = post(&worker, json!({"type": "NOPE"})).await;
        assert_eq!(output.reply, None);
    }
}
