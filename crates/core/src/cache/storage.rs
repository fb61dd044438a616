//! Named cache operations.
//!
//! A cache is a named bucket of entries. Opening creates it, deleting it
//! drops every entry it owns.

use super::connection::CacheDb;
use super::timestamp;
use crate::Error;
use tokio_rusqlite::params;

impl CacheDb {
    /// Open (create if missing) the cache called `name`.
    pub async fn open_cache(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = timestamp(chrono::Utc::now());
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a cache called `name` exists.
    pub async fn has_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List every cache name in creation order.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY created_at ASC, rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the cache called `name` and all of its entries.
    ///
    /// Returns false if no such cache existed.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every cache. Returns the number of caches removed.
    pub async fn delete_all_caches(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let deleted = conn.execute("DELETE FROM caches", [])?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
