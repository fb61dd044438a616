//! Cache entry operations.
//!
//! Entries are stored responses keyed by request. Lookups refresh the
//! entry's access time, which drives LRU trimming.

use std::time::Duration;

use super::connection::CacheDb;
use super::hash::get_key;
use super::timestamp;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// A stored response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CachedResponse {
    /// Request URL the response was stored under.
    pub url: String,
    pub status: u16,
    /// Response headers in received order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// When the entry was written (RFC 3339, UTC).
    pub stored_at: String,
}

impl CachedResponse {
    pub fn new(url: impl Into<String>, status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self { url: url.into(), status, headers, body, stored_at: timestamp(chrono::Utc::now()) }
    }

    /// Whether the status is in the 2xx range, the only responses cached.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with the given (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn row_to_response(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, u16, String, Vec<u8>, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode(
    (url, status, headers_json, body, stored_at): (String, u16, String, Vec<u8>, String),
) -> Result<CachedResponse, Error> {
    let headers = serde_json::from_str(&headers_json)
        .map_err(|e| Error::InvalidInput(format!("corrupt headers for {url}: {e}")))?;
    Ok(CachedResponse { url, status, headers, body, stored_at })
}

fn insert_entry(conn: &rusqlite::Connection, cache: &str, response: &CachedResponse) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers)
        .map_err(|e| Error::InvalidInput(format!("failed to encode headers: {e}")))?;
    conn.execute(
        "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
        params![cache, response.stored_at],
    )?;
    conn.execute(
        "INSERT INTO cache_entries (
            cache_name, key, url, method, status, headers_json, body, stored_at, accessed_at
        ) VALUES (?1, ?2, ?3, 'GET', ?4, ?5, ?6, ?7, ?7)
        ON CONFLICT(cache_name, key) DO UPDATE SET
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at,
            accessed_at = excluded.accessed_at",
        params![
            cache,
            get_key(&response.url),
            response.url,
            response.status,
            headers_json,
            response.body,
            response.stored_at,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Store a response in `cache`, creating the cache if needed.
    ///
    /// Replaces any entry for the same request (last writer wins).
    pub async fn put_entry(&self, cache: &str, response: &CachedResponse) -> Result<(), Error> {
        let cache = cache.to_string();
        let response = response.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> { insert_entry(conn, &cache, &response) })
            .await
            .map_err(Error::from)
    }

    /// Store a batch of responses in one transaction.
    ///
    /// Either every response is written or none is.
    pub async fn put_entries(&self, cache: &str, responses: Vec<CachedResponse>) -> Result<(), Error> {
        let cache = cache.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for response in &responses {
                    insert_entry(&tx, &cache, response)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry for a GET of `url` in `cache`.
    ///
    /// Returns None if the cache or entry doesn't exist.
    pub async fn match_entry(&self, cache: &str, url: &str) -> Result<Option<CachedResponse>, Error> {
        let cache = cache.to_string();
        let key = get_key(url);
        let now = timestamp(chrono::Utc::now());
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let row = conn
                    .query_row(
                        "SELECT url, status, headers_json, body, stored_at
                         FROM cache_entries WHERE cache_name = ?1 AND key = ?2",
                        params![cache, key],
                        row_to_response,
                    )
                    .optional()?;

                let Some(row) = row else { return Ok(None) };
                conn.execute(
                    "UPDATE cache_entries SET accessed_at = ?3 WHERE cache_name = ?1 AND key = ?2",
                    params![cache, key, now],
                )?;
                decode(row).map(Some)
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry for a GET of `url` in any cache.
    ///
    /// Caches are searched in creation order; the first hit wins.
    pub async fn match_any(&self, url: &str) -> Result<Option<CachedResponse>, Error> {
        let key = get_key(url);
        let now = timestamp(chrono::Utc::now());
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let row = conn
                    .query_row(
                        "SELECT e.url, e.status, e.headers_json, e.body, e.stored_at, e.cache_name
                         FROM cache_entries e JOIN caches c ON c.name = e.cache_name
                         WHERE e.key = ?1
                         ORDER BY c.created_at ASC, c.rowid ASC
                         LIMIT 1",
                        params![key],
                        |row| Ok((row_to_response(row)?, row.get::<_, String>(5)?)),
                    )
                    .optional()?;

                let Some((row, cache)) = row else { return Ok(None) };
                conn.execute(
                    "UPDATE cache_entries SET accessed_at = ?3 WHERE cache_name = ?1 AND key = ?2",
                    params![cache, key, now],
                )?;
                decode(row).map(Some)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in `cache`.
    pub async fn entry_count(&self, cache: &str) -> Result<u64, Error> {
        let cache = cache.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1",
                    params![cache],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Evict least recently used entries until `cache` holds at most `max_entries`.
    ///
    /// Returns the number of deleted entries.
    pub async fn trim_cache(&self, cache: &str, max_entries: usize) -> Result<u64, Error> {
        let cache = cache.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1",
                    params![cache],
                    |row| row.get(0),
                )?;
                if count <= max {
                    return Ok(0);
                }

                let deleted = conn.execute(
                    "DELETE FROM cache_entries WHERE rowid IN (
                        SELECT rowid FROM cache_entries WHERE cache_name = ?1
                        ORDER BY accessed_at ASC, rowid ASC LIMIT ?2
                    )",
                    params![cache, count - max],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries in `cache` stored more than `max_age` ago.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired_entries(&self, cache: &str, max_age: Duration) -> Result<u64, Error> {
        let cache = cache.to_string();
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let cutoff = chrono::Utc::now()
            .checked_sub_signed(max_age)
            .map(timestamp)
            .unwrap_or_default();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE cache_name = ?1 AND stored_at < ?2",
                    params![cache, cutoff],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries in `cache` whose URL contains `pattern`.
    ///
    /// The match is a literal, case-sensitive substring: `%` and `_` have no
    /// special meaning. Returns the number of deleted entries.
    pub async fn purge_entries_matching(&self, cache: &str, pattern: &str) -> Result<u64, Error> {
        let cache = cache.to_string();
        let pattern = pattern.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE cache_name = ?1 AND instr(url, ?2) > 0",
                    params![cache, pattern],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
