//! Control messages posted to the worker.

use offcache_core::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::Worker;

/// A message understood by the worker, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate as soon as install has finished.
    SkipWaiting,
    /// Reply with the current version.
    GetVersion,
    /// Delete every cache.
    CleanCache,
}

impl Worker {
    /// Handle a posted message, returning the reply (if the message has one).
    ///
    /// Messages with a missing or unknown `type` are logged and ignored.
    pub async fn handle_message(&self, message: Value) -> Result<Option<Value>, Error> {
        let message = match serde_json::from_value::<ControlMessage>(message.clone()) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(%message, error = %e, "ignoring unknown message");
                return Ok(None);
            }
        };

        tracing::debug!(?message, "control message");
        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting();
                Ok(None)
            }
            ControlMessage::GetVersion => Ok(Some(json!({ "version": self.version() }))),
            ControlMessage::CleanCache => {
                let deleted = self.caches.delete_all_caches().await?;
                tracing::info!(deleted, "all caches deleted");
                Ok(Some(json!({ "deleted": deleted })))
            }
        }
    }
}
