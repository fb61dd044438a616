//! Schema for the cache database.
//!
//! Version 1 creates the named caches and their entries (`caches`,
//! `cache_entries`, cascading on cache deletion). Version 2 adds the
//! background-sync form queue (`sync_queue`). Applied versions are recorded
//! in `_migrations`, so opening an existing database only runs what is new.

use super::{Error, timestamp};
use tokio_rusqlite::{Connection, params};

/// Schema steps in application order: (version, SQL).
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_caches.sql")),
    (2, include_str!("../../migrations/002_sync_queue.sql")),
];

/// Bring the schema up to the latest version.
///
/// Each pending step runs in its own transaction together with its
/// `_migrations` row, so a failed step leaves the previous version intact.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current: i64 =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for &(version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("schema version {version}: {e}")))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, timestamp(chrono::Utc::now())],
            )?;
            tx.commit()?;
            tracing::debug!(version, "schema migrated");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
