//! Background sync: replay queued form submissions.

use bytes::Bytes;
use offcache_client::{FetchRequest, Method, header};
use offcache_core::{CONTACT_FORM_SYNC, Error, NewForm, QueuedForm};
use serde::Serialize;

use super::Worker;

/// Outcome of one sync event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct SyncReport {
    pub tag: String,
    /// Forms delivered and removed from the queue.
    pub replayed: usize,
    /// Forms that stay queued for the next sync.
    pub failed: usize,
}

impl Worker {
    /// Fire a sync event for `tag`.
    ///
    /// Returns `SyncFailed` if any form could not be delivered, so the host
    /// retries later. Unknown tags are logged and produce an empty report.
    pub async fn handle_sync(&self, tag: &str) -> Result<SyncReport, Error> {
        let mut report = SyncReport { tag: tag.to_string(), ..Default::default() };
        if tag != CONTACT_FORM_SYNC {
            tracing::warn!(tag, "ignoring unknown sync tag");
            return Ok(report);
        }

        let forms = self.queue.drain(tag).await?;
        if forms.is_empty() {
            return Ok(report);
        }
        tracing::info!(tag, pending = forms.len(), "replaying queued forms");

        for form in forms {
            match self.replay(&form).await {
                Ok(()) => {
                    self.queue.ack(form.id).await?;
                    report.replayed += 1;
                }
                Err(reason) => {
                    tracing::warn!(id = form.id, url = %form.url, %reason, "form replay failed");
                    self.queue.record_failure(form.id, &reason).await?;
                    report.failed += 1;
                }
            }
        }

        if report.failed > 0 {
            return Err(Error::SyncFailed(format!(
                "{} of {} forms not delivered",
                report.failed,
                report.failed + report.replayed
            )));
        }
        Ok(report)
    }

    async fn replay(&self, form: &QueuedForm) -> Result<(), String> {
        let url = self.resolve(&form.url).map_err(|e| e.to_string())?;
        let mut request = FetchRequest::get(url);
        request.method = Method::POST;
        request.body = Bytes::from(form.body.clone());
        if let Some(content_type) = &form.content_type {
            request = request.with_header(header::CONTENT_TYPE, content_type);
        }

        let response = self.network.fetch(request).await.map_err(|e| e.to_string())?;
        if !response.is_ok() {
            return Err(format!("status {}", response.status.as_u16()));
        }
        Ok(())
    }

    /// Queue a form submission for the next sync.
    pub async fn enqueue_form(&self, form: NewForm) -> Result<i64, Error> {
        if form.url.trim().is_empty() {
            return Err(Error::InvalidInput("form url must not be empty".to_string()));
        }
        self.resolve(&form.url)?;
        let id = self.queue.enqueue(form).await?;
        tracing::debug!(id, "form queued");
        Ok(id)
    }
}
