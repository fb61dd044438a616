//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - Named response caches with a SQLite backend
//! - Request classification into caching strategies
//! - The background-sync form queue
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod sync;

pub use cache::{CacheDb, CachedResponse};
pub use classify::{RequestClass, Strategy, classify};
pub use config::AppConfig;
pub use error::Error;
pub use sync::{CONTACT_FORM_SYNC, FormQueue, NewForm, QueuedForm};
