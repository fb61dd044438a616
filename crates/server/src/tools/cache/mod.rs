//! Cache inspection MCP tools.

pub mod get;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use purge::{CachePurgeParams, purge_impl};
