//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `origin_url` is not an absolute http(s) URL
    /// - a cache name is empty, or both cache names are equal
    /// - a `precache` entry does not start with `/`
    /// - `dynamic_max_entries` or `install_max_attempts` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        match url::Url::parse(&self.origin_url) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") && origin.has_host() => {}
            Ok(origin) => return Err(invalid("origin_url", format!("unsupported origin: {origin}"))),
            Err(e) => return Err(invalid("origin_url", e.to_string())),
        }

        if self.static_cache_name.is_empty() {
            return Err(invalid("static_cache_name", "must not be empty"));
        }
        if self.dynamic_cache_name.is_empty() {
            return Err(invalid("dynamic_cache_name", "must not be empty"));
        }
        if self.static_cache_name == self.dynamic_cache_name {
            return Err(invalid("dynamic_cache_name", "must differ from static_cache_name"));
        }

        if let Some(entry) = self.precache.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("precache", format!("entry {entry:?} must start with '/'")));
        }

        if self.dynamic_max_entries == 0 {
            return Err(invalid("dynamic_max_entries", "must be greater than 0"));
        }

        if self.install_max_attempts == 0 {
            return Err(invalid("install_max_attempts", "must be at least 1"));
        }

        if self.precache.is_empty() {
            tracing::warn!("precache manifest is empty; the offline root document will never be available");
        }

        Ok(())
    }
}
