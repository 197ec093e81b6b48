//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (MOTIONMAP_*)
//! 2. TOML config file (if MOTIONMAP_CONFIG_FILE set)
//! 3. Built-in defaults

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
/// 1. Environment variables (MOTIONMAP_*)
/// 2. TOML config file (if MOTIONMAP_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database backing the cache stores.
    ///
    /// Set via MOTIONMAP_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the gallery is served from. Precache paths resolve against it
    /// and responses from it count as same-origin.
    ///
    /// Set via MOTIONMAP_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix shared by every store name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Store generation. Bumping it retires every store of older generations
    /// on the next activation.
    ///
    /// Set via MOTIONMAP_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: u32,

    /// Shell paths written to the shell store at install.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Hosts of third-party form backends, always handled network-first.
    #[serde(default = "default_form_backend_hosts")]
    pub form_backend_hosts: Vec<String>,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./motionmap-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_cache_prefix() -> String {
    "motionmap".into()
}

fn default_cache_version() -> u32 {
    1
}

fn default_precache() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.json".into()]
}

fn default_form_backend_hosts() -> Vec<String> {
    vec!["script.google.com".into()]
}

fn default_user_agent() -> String {
    "motionmap-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    25 * 1024 * 1024 // 25MB, audio loops included
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            precache: default_precache(),
            form_backend_hosts: default_form_backend_hosts(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("MOTIONMAP_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("MOTIONMAP_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }
}
