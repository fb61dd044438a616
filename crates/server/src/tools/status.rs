//! sw_status tool implementation.

use offcache_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::worker::{ClientInfo, LifecycleState, Worker};

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwStatusOutput {
    pub state: LifecycleState,
    pub version: String,
    pub origin: String,
    /// Cache names in creation order.
    pub caches: Vec<String>,
    pub clients: Vec<ClientInfo>,
}

pub async fn status_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let output = SwStatusOutput {
        state: worker.state(),
        version: worker.version().to_string(),
        origin: worker.origin().to_string(),
        caches: worker.caches().cache_names().await?,
        clients: worker.clients().all().await,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize status: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tool_text;
    use crate::worker::testing::{ScriptedNetwork, activated_worker, test_worker};

    #[tokio::test]
    async fn test_status_before_start() {
        let worker = test_worker(ScriptedNetwork::default()).await;

        let value: serde_json::Value = serde_json::from_str(&tool_text(&status_impl(&worker).await.unwrap())).unwrap();

        assert_eq!(value["state"], "parsed");
        assert_eq!(value["version"], "offcache-static-v1");
        assert_eq!(value["caches"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_status_activated() {
        let worker = activated_worker(ScriptedNetwork::with_site()).await;

        let value: serde_json::Value = serde_json::from_str(&tool_text(&status_impl(&worker).await.unwrap())).unwrap();

        assert_eq!(value["state"], "activated");
        assert_eq!(value["origin"], "https://example.com/");
        assert_eq!(value["caches"], serde_json::json!(["offcache-static-v1", "offcache-dynamic-v1"]));
    }
}
