//! Push notifications and notification clicks.

use async_trait::async_trait;
use offcache_core::Error;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::Worker;

/// Vibration pattern in milliseconds (on, off, on).
pub const VIBRATE_PATTERN: [u32; 3] = [100, 50, 100];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationData {
    pub url: String,
}

/// A notification built from a push payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub actions: Vec<NotificationAction>,
    pub data: NotificationData,
}

/// Displays notifications to the user.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<(), Error>;
}

/// Notifier that logs each notification and keeps a copy.
#[derive(Debug, Default)]
pub struct LogNotifier {
    shown: Mutex<Vec<Notification>>,
}

impl LogNotifier {
    /// Every notification shown so far, oldest first.
    #[cfg(test)]
    pub async fn shown(&self) -> Vec<Notification> {
        self.shown.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, body = %notification.body, url = %notification.data.url, "notification");
        self.shown.lock().await.push(notification.clone());
        Ok(())
    }
}

/// What a notification click did to the worker's clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(tag = "action", content = "url", rename_all = "snake_case")]
pub enum ClientAction {
    /// An existing client at this URL was focused.
    Focus(String),
    /// A new window was opened at this URL.
    OpenWindow(String),
    /// The notification was only closed.
    None,
}

impl Worker {
    /// Build a notification from a push payload and show it.
    ///
    /// A missing or blank payload uses the configured default body.
    pub async fn handle_push(&self, payload: Option<String>) -> Result<Notification, Error> {
        let body = payload
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| self.config.push_body.clone());

        let notification = Notification {
            title: self.config.push_title.clone(),
            body,
            icon: self.config.push_icon.clone(),
            badge: self.config.push_badge.clone(),
            vibrate: VIBRATE_PATTERN.to_vec(),
            actions: vec![
                NotificationAction { action: "open".into(), title: "Open".into() },
                NotificationAction { action: "dismiss".into(), title: "Dismiss".into() },
            ],
            data: NotificationData { url: self.config.notification_url.clone() },
        };

        self.notifier.show(&notification).await?;
        Ok(notification)
    }

    /// React to a click on a shown notification.
    ///
    /// `dismiss` only closes it. Any other action (or a click on the body)
    /// focuses a client already at the target URL, or opens a new one.
    pub async fn handle_notification_click(&self, action: Option<&str>, url: Option<&str>) -> Result<ClientAction, Error> {
        if action == Some("dismiss") {
            return Ok(ClientAction::None);
        }

        let target = url.unwrap_or(&self.config.notification_url);
        let target = self.resolve(target)?.to_string();

        if let Some(client) = self.clients.focus(&target).await {
            tracing::debug!(id = client.id, url = %target, "focused client");
            return Ok(ClientAction::Focus(target));
        }

        self.clients.register(&target).await;
        self.clients.focus(&target).await;
        tracing::debug!(url = %target, "opened window");
        Ok(ClientAction::OpenWindow(target))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ScriptedNetwork, test_worker, test_worker_with_notifier};
    use super::*;
    use offcache_client::{FetchRequest, header};

    #[tokio::test]
    async fn test_push_builds_notification() {
        let (worker, notifier) = test_worker_with_notifier(ScriptedNetwork::default()).await;

        let notification = worker.handle_push(Some("New lead from Acme".into())).await.unwrap();

        assert_eq!(notification.title, "offcache");
        assert_eq!(notification.body, "New lead from Acme");
        assert_eq!(notification.icon, "/icons/icon-192x192.png");
        assert_eq!(notification.badge, "/icons/icon-72x72.png");
        assert_eq!(notification.vibrate, vec![100, 50, 100]);
        let actions: Vec<_> = notification.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["open", "dismiss"]);
        assert_eq!(notifier.shown().await, vec![notification]);
    }

    #[tokio::test]
    async fn test_push_without_payload_uses_default_body() {
        let worker = test_worker(ScriptedNetwork::default()).await;
        assert_eq!(worker.handle_push(None).await.unwrap().body, "You have a new notification");
        assert_eq!(worker.handle_push(Some("  ".into())).await.unwrap().body, "You have a new notification");
    }

    #[tokio::test]
    async fn test_click_dismiss() {
        let worker = test_worker(ScriptedNetwork::default()).await;
        let action = worker.handle_notification_click(Some("dismiss"), Some("/")).await.unwrap();
        assert_eq!(action, ClientAction::None);
        assert!(worker.clients().all().await.is_empty());
    }

    #[tokio::test]
    async fn test_click_focuses_existing_client() {
        let worker = test_worker(ScriptedNetwork::with_site()).await;
        let request = FetchRequest::get(worker.resolve("/").unwrap()).with_header(header::ACCEPT, "text/html");
        worker.handle_fetch(request).await.unwrap();

        let action = worker.handle_notification_click(Some("open"), None).await.unwrap();

        assert_eq!(action, ClientAction::Focus("https://example.com/".into()));
        assert_eq!(worker.clients().all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_click_opens_window() {
        let worker = test_worker(ScriptedNetwork::default()).await;

        let action = worker.handle_notification_click(None, Some("/leads")).await.unwrap();

        assert_eq!(action, ClientAction::OpenWindow("https://example.com/leads".into()));
        let clients = worker.clients().all().await;
        assert_eq!(clients.len(), 1);
        assert!(clients[0].focused);
    }

    #[tokio::test]
    async fn test_click_rejects_foreign_origin() {
        let worker = test_worker(ScriptedNetwork::default()).await;

        let result = worker.handle_notification_click(Some("open"), Some("https://evil.example.net/x")).await;

        assert!(matches!(result, Err(Error::InvalidUrl(_))));
        assert!(worker.clients().all().await.is_empty());
    }

    #[test]
    fn test_client_action_wire_format() {
        let value = serde_json::to_value(ClientAction::Focus("https://example.com/".into())).unwrap();
        assert_eq!(value, serde_json::json!({"action": "focus", "url": "https://example.com/"}));
        assert_eq!(serde_json::to_value(ClientAction::None).unwrap(), serde_json::json!({"action": "none"}));
    }
}
