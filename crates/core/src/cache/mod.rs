//! SQLite-backed named response caches.
//!
//! This module provides persistent storage shaped like the browser Cache
//! Storage API, using SQLite with async access via tokio-rusqlite:
//!
//! - Named caches that can be opened, listed and deleted as a unit
//! - Entries keyed by a SHA-256 of request method and URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Bounded caches via LRU trimming and age-based purging

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedResponse;

/// Timestamp format used for every stored time.
///
/// Fixed-width UTC with microseconds, so string order equals time order.
pub(crate) fn timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
