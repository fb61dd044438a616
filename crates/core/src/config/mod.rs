//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFCACHE_*)
//! 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFCACHE_*)
/// 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the interception proxy listens on.
    ///
    /// Set via OFFCACHE_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Origin every intercepted request is forwarded to.
    ///
    /// Set via OFFCACHE_ORIGIN_URL environment variable.
    #[serde(default = "default_origin_url")]
    pub origin_url: String,

    /// Path to SQLite cache database.
    ///
    /// Set via OFFCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for origin requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects followed per origin request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Name of the cache filled at install time.
    ///
    /// Bumping this (together with `dynamic_cache_name`) rotates every cached
    /// asset on the next activation.
    #[serde(default = "default_static_cache_name")]
    pub static_cache_name: String,

    /// Name of the cache filled lazily from network responses.
    #[serde(default = "default_dynamic_cache_name")]
    pub dynamic_cache_name: String,

    /// Paths fetched into the static cache during install.
    ///
    /// Set via OFFCACHE_PRECACHE environment variable (`[/,/css/styles.css]`).
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Message carried in the synthesized 503 offline payload.
    #[serde(default = "default_offline_message")]
    pub offline_message: String,

    /// Upper bound on dynamic cache entries; least recently used go first.
    #[serde(default = "default_dynamic_max_entries")]
    pub dynamic_max_entries: usize,

    /// Dynamic entries older than this are purged on activation.
    #[serde(default)]
    pub dynamic_max_age_secs: Option<u64>,

    /// Install attempts before the worker is marked redundant.
    #[serde(default = "default_install_max_attempts")]
    pub install_max_attempts: u32,

    /// Delay between install attempts in milliseconds.
    #[serde(default = "default_install_retry_ms")]
    pub install_retry_ms: u64,

    /// Interval for firing the contact-form sync, if any.
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,

    /// Title shown on push notifications.
    #[serde(default = "default_push_title")]
    pub push_title: String,

    /// Body used when a push arrives without payload.
    #[serde(default = "default_push_body")]
    pub push_body: String,

    #[serde(default = "default_push_icon")]
    pub push_icon: String,

    #[serde(default = "default_push_badge")]
    pub push_badge: String,

    /// Page opened when a notification is clicked.
    #[serde(default = "default_notification_url")]
    pub notification_url: String,

    /// Whether the MCP control surface is served on stdio.
    #[serde(default = "default_true")]
    pub mcp_stdio: bool,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_origin_url() -> String {
    "http://127.0.0.1:3000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offcache.sqlite")
}

fn default_user_agent() -> String {
    "offcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_static_cache_name() -> String {
    "offcache-static-v1".into()
}

fn default_dynamic_cache_name() -> String {
    "offcache-dynamic-v1".into()
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/css/styles.css",
        "/js/main.js",
        "/js/chat-demo.js",
        "/js/dashboard.js",
        "/js/analytics.js",
        "/manifest.json",
        "/icons/icon-192x192.png",
        "/icons/icon-512x512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_offline_message() -> String {
    "You are offline. Please check your connection and try again.".into()
}

fn default_dynamic_max_entries() -> usize {
    200
}

fn default_install_max_attempts() -> u32 {
    3
}

fn default_install_retry_ms() -> u64 {
    2_000
}

fn default_push_title() -> String {
    "offcache".into()
}

fn default_push_body() -> String {
    "You have a new notification".into()
}

fn default_push_icon() -> String {
    "/icons/icon-192x192.png".into()
}

fn default_push_badge() -> String {
    "/icons/icon-72x72.png".into()
}

fn default_notification_url() -> String {
    "/".into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            origin_url: default_origin_url(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            static_cache_name: default_static_cache_name(),
            dynamic_cache_name: default_dynamic_cache_name(),
            precache: default_precache(),
            offline_message: default_offline_message(),
            dynamic_max_entries: default_dynamic_max_entries(),
            dynamic_max_age_secs: None,
            install_max_attempts: default_install_max_attempts(),
            install_retry_ms: default_install_retry_ms(),
            sync_interval_secs: None,
            push_title: default_push_title(),
            push_body: default_push_body(),
            push_icon: default_push_icon(),
            push_badge: default_push_badge(),
            notification_url: default_notification_url(),
            mcp_stdio: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn install_retry_delay(&self) -> Duration {
        Duration::from_millis(self.install_retry_ms)
    }

    pub fn dynamic_max_age(&self) -> Option<Duration> {
        self.dynamic_max_age_secs.map(Duration::from_secs)
    }

    pub fn sync_interval(&self) -> Option<Duration> {
        self.sync_interval_secs.map(Duration::from_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFCACHE_`
    /// 2. TOML file from `OFFCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./offcache.sqlite"));
        assert_eq!(config.user_agent, "offcache/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.static_cache_name, "offcache-static-v1");
        assert_eq!(config.dynamic_cache_name, "offcache-dynamic-v1");
        assert!(config.precache.contains(&"/".to_string()));
        assert!(config.dynamic_max_age_secs.is_none());
        assert!(config.sync_interval_secs.is_none());
        assert!(config.mcp_stdio);
    }

    #[test]
    fn test_durations() {
        let config = AppConfig { dynamic_max_age_secs: Some(60), sync_interval_secs: Some(30), ..Default::default() };
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.install_retry_delay(), Duration::from_millis(2_000));
        assert_eq!(config.dynamic_max_age(), Some(Duration::from_secs(60)));
        assert_eq!(config.sync_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_load_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("OFFCACHE_STATIC_CACHE_NAME", "site-static-v2");
            jail.set_env("OFFCACHE_DYNAMIC_MAX_ENTRIES", "50");
            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.static_cache_name, "site-static-v2");
            assert_eq!(config.dynamic_max_entries, 50);
            assert_eq!(config.dynamic_cache_name, "offcache-dynamic-v1");
            Ok(())
        });
    }

    #[test]
    fn test_load_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "offcache.toml",
                r#"
                origin_url = "https://example.com"
                precache = ["/", "/app.js"]
                "#,
            )?;
            jail.set_env("OFFCACHE_CONFIG_FILE", "offcache.toml");
            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.origin_url, "https://example.com");
            assert_eq!(config.precache, vec!["/".to_string(), "/app.js".to_string()]);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("OFFCACHE_MAX_BYTES", "0");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }
}
