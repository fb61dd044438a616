//! Background-sync form queue.
//!
//! Form submissions that could not reach the network are parked here and
//! replayed when a sync event fires. The worker only talks to the
//! [`FormQueue`] trait; [`CacheDb`] provides the SQLite-backed store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

use crate::cache::{CacheDb, timestamp};
use crate::Error;

/// Sync tag used for contact form retries.
pub const CONTACT_FORM_SYNC: &str = "contact-form-sync";

/// A form submission waiting to be replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct QueuedForm {
    pub id: i64,
    pub tag: String,
    pub url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub enqueued_at: String,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// A form submission to enqueue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NewForm {
    pub tag: String,
    pub url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Durable queue of form submissions awaiting background sync.
///
/// `drain` does not remove anything: a form leaves the queue only when it is
/// acked, so a crash mid-replay resubmits instead of losing data.
#[async_trait]
pub trait FormQueue: Send + Sync {
    /// Add a form; returns its queue id.
    async fn enqueue(&self, form: NewForm) -> Result<i64, Error>;

    /// Forms queued under `tag`, oldest first.
    async fn drain(&self, tag: &str) -> Result<Vec<QueuedForm>, Error>;

    /// Remove a successfully replayed form. Returns false if it was unknown.
    async fn ack(&self, id: i64) -> Result<bool, Error>;

    /// Note a failed replay attempt.
    async fn record_failure(&self, id: i64, reason: &str) -> Result<(), Error>;
}

#[async_trait]
impl FormQueue for CacheDb {
    async fn enqueue(&self, form: NewForm) -> Result<i64, Error> {
        let enqueued_at = timestamp(chrono::Utc::now());
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO sync_queue (tag, url, content_type, body, enqueued_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![form.tag, form.url, form.content_type, form.body, enqueued_at],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Error::from)
    }

    async fn drain(&self, tag: &str) -> Result<Vec<QueuedForm>, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<QueuedForm>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, tag, url, content_type, body, enqueued_at, attempts, last_error
                     FROM sync_queue WHERE tag = ?1 ORDER BY id ASC",
                )?;
                let forms = stmt
                    .query_map(params![tag], |row| {
                        Ok(QueuedForm {
                            id: row.get(0)?,
                            tag: row.get(1)?,
                            url: row.get(2)?,
                            content_type: row.get(3)?,
                            body: row.get(4)?,
                            enqueued_at: row.get(5)?,
                            attempts: row.get(6)?,
                            last_error: row.get(7)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(forms)
            })
            .await
            .map_err(Error::from)
    }

    async fn ack(&self, id: i64) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM sync_queue WHERE id = ?1", params![id])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn record_failure(&self, id: i64, reason: &str) -> Result<(), Error> {
        let reason = reason.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE sync_queue SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
                    params![id, reason],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact_form(body: &str) -> NewForm {
        NewForm {
            tag: CONTACT_FORM_SYNC.to_string(),
            url: "https://example.com/api/contact".to_string(),
            content_type: Some("application/json".to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_enqueue_and_drain_in_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let first = db.enqueue(contact_form(r#"{"n":1}"#)).await.unwrap();
        let second = db.enqueue(contact_form(r#"{"n":2}"#)).await.unwrap();

        let forms = db.drain(CONTACT_FORM_SYNC).await.unwrap();
        assert_eq!(forms.iter().map(|f| f.id).collect::<Vec<_>>(), vec![first, second]);
        assert_eq!(forms[0].attempts, 0);

        // Draining does not consume.
        assert_eq!(db.drain(CONTACT_FORM_SYNC).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_drain_filters_by_tag() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.enqueue(contact_form("{}")).await.unwrap();
        db.enqueue(NewForm { tag: "newsletter-sync".into(), ..contact_form("{}") })
            .await
            .unwrap();

        assert_eq!(db.drain(CONTACT_FORM_SYNC).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ack_removes() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let id = db.enqueue(contact_form("{}")).await.unwrap();

        assert!(db.ack(id).await.unwrap());
        assert!(!db.ack(id).await.unwrap());
        assert!(db.drain(CONTACT_FORM_SYNC).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_failure() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let id = db.enqueue(contact_form("{}")).await.unwrap();

        db.record_failure(id, "status 500").await.unwrap();
        db.record_failure(id, "connection refused").await.unwrap();

        let form = &db.drain(CONTACT_FORM_SYNC).await.unwrap()[0];
        assert_eq!(form.attempts, 2);
        assert_eq!(form.last_error.as_deref(), Some("connection refused"));
    }
}
