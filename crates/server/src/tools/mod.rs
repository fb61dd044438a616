//! MCP tool implementations.
//!
//! Every tool drives the shared [`Worker`](crate::worker::Worker) and
//! returns its output as pretty-printed JSON text.

pub mod cache;
pub mod message;
pub mod push;
pub mod status;
pub mod sync;

pub use cache::{CacheGetParams, CachePurgeParams};
pub use message::SwMessageParams;
pub use push::{NotificationClickParams, PushParams};
pub use sync::{SyncEnqueueParams, SyncParams};

/// The text content of a successful tool result.
#[cfg(test)]
pub(crate) fn tool_text(result: &rmcp::model::CallToolResult) -> String {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content")
        .to_string()
}
