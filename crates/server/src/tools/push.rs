//! push and notification_click tool implementations.

use offcache_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::worker::{ClientAction, Worker};

/// Parameters for the push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    /// Plain-text push payload, used as the notification body.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Parameters for the notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// Clicked action ("open" or "dismiss"); omitted for a click on the body.
    #[serde(default)]
    pub action: Option<String>,

    /// The notification's data url (default: the configured notification url).
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct NotificationClickOutput {
    pub result: ClientAction,
}

pub async fn push_impl(worker: &Worker, params: PushParams) -> Result<CallToolResult, McpError> {
    let notification = worker.handle_push(params.payload).await?;

    let json = serde_json::to_string_pretty(&notification)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize notification: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

pub async fn click_impl(worker: &Worker, params: NotificationClickParams) -> Result<CallToolResult, McpError> {
    let result = worker
        .handle_notification_click(params.action.as_deref(), params.url.as_deref())
        .await?;

    let json = serde_json::to_string_pretty(&NotificationClickOutput { result })
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize click result: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
