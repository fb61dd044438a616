//! sync and sync_enqueue tool implementations.

use offcache_core::{CONTACT_FORM_SYNC, Error, NewForm};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::worker::Worker;

fn default_tag() -> String {
    CONTACT_FORM_SYNC.into()
}

/// Parameters for the sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    /// Sync tag to fire (default: "contact-form-sync").
    #[serde(default = "default_tag")]
    pub tag: String,
}

/// Parameters for the sync_enqueue tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncEnqueueParams {
    /// Path on the origin the form posts to.
    pub url: String,

    /// Raw form body.
    pub body: String,

    /// Content-Type of the body.
    #[serde(default)]
    pub content_type: Option<String>,

    /// Sync tag to queue under (default: "contact-form-sync").
    #[serde(default = "default_tag")]
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncEnqueueOutput {
    /// Queue id of the stored form.
    pub id: i64,
}

pub async fn sync_impl(worker: &Worker, params: SyncParams) -> Result<CallToolResult, McpError> {
    let report = worker.handle_sync(&params.tag).await?;

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize report: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

pub async fn enqueue_impl(worker: &Worker, params: SyncEnqueueParams) -> Result<CallToolResult, McpError> {
    let form = NewForm {
        tag: params.tag,
        url: params.url,
        content_type: params.content_type,
        body: params.body.into_bytes(),
    };
    let id = worker.enqueue_form(form).await?;

    let json = serde_json::to_string_pretty(&SyncEnqueueOutput { id })
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tool_text;
    use crate::worker::testing::{ScriptedNetwork, test_worker};

    fn form() -> SyncEnqueueParams {
        SyncEnqueueParams {
            url: "/api/contact".into(),
            body: "name=a".into(),
            content_type: Some("application/x-www-form-urlencoded".into()),
            tag: default_tag(),
        }
    }

    #[test]
    fn test_tag_defaults() {
        let params: SyncParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.tag, "contact-form-sync");
    }

    #[tokio::test]
    async fn test_enqueue_then_sync() {
        let network = ScriptedNetwork::default();
        network.respond("/api/contact", 200, "ok");
        let worker = test_worker(network).await;

        let result = enqueue_impl(&worker, form()).await.unwrap();
        let output: SyncEnqueueOutput = serde_json::from_str(&tool_text(&result)).unwrap();
        assert!(output.id > 0);

        let result = sync_impl(&worker, SyncParams { tag: default_tag() }).await.unwrap();
        let report: serde_json::Value = serde_json::from_str(&tool_text(&result)).unwrap();
        assert_eq!(report["replayed"], 1);
        assert_eq!(report["failed"], 0);
    }

    #[tokio::test]
    async fn test_sync_failure_maps_to_error() {
        let network = ScriptedNetwork::default();
        network.set_online(false);
        let worker = test_worker(network).await;
        enqueue_impl(&worker, form()).await.unwrap();

        let err = sync_impl(&worker, SyncParams { tag: default_tag() }).await.unwrap_err();
        assert_eq!(err.code.0, -32010);
    }
}
