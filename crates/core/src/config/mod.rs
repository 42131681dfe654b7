//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CINECACHE_*)
//! 2. TOML config file (if CINECACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::worker::GenerationConfig;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CINECACHE_*)
/// 2. TOML config file (if CINECACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding partitions and records.
    ///
    /// Set via CINECACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the application shell is served from.
    ///
    /// Relative manifest entries and the offline URL resolve against it.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Name of the static partition for the current generation.
    #[serde(default = "default_static_cache")]
    pub static_cache: String,

    /// Name of the dynamic partition for the current generation.
    #[serde(default = "default_dynamic_cache")]
    pub dynamic_cache: String,

    /// Document served when a navigation fails offline.
    ///
    /// Must be listed in `static_assets`.
    #[serde(default = "default_offline_url")]
    pub offline_url: String,

    /// Static asset manifest, fetched in full at install time.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Ceiling on the number of entries in the dynamic partition.
    ///
    /// Set via CINECACHE_MAX_DYNAMIC_ENTRIES environment variable.
    #[serde(default = "default_max_dynamic_entries")]
    pub max_dynamic_entries: usize,

    /// Whether navigations consult a preload response before fetching.
    #[serde(default = "default_true")]
    pub navigation_preload: bool,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional HTTP timeout in milliseconds. Unset means no timeout.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// TMDB API key, appended as the `api_key` query parameter.
    ///
    /// Set via CINECACHE_TMDB_API_KEY environment variable.
    /// Required only when catalog tools are called.
    #[serde(default)]
    pub tmdb_api_key: Option<String>,

    /// TMDB API base URL.
    #[serde(default = "default_tmdb_base_url")]
    pub tmdb_base_url: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./cinecache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:5500".into()
}

fn default_static_cache() -> String {
    "static-v3".into()
}

fn default_dynamic_cache() -> String {
    "dynamic-3".into()
}

fn default_offline_url() -> String {
    "/404.html".into()
}

fn default_static_assets() -> Vec<String> {
    [
        "/",
        "/home.html",
        "/404.html",
        "/css/app.css",
        "/css/materialize.min.css",
        "/js/app.js",
        "/js/materialize.min.js",
        "/img/icons/android-chrome-192x192.png",
        "/img/icons/android-chrome-512x512.png",
        "/img/icons/apple-touch-icon.png",
        "/img/icons/favicon-16x16.png",
        "/img/icons/favicon-32x32.png",
        "/img/icons/favicon.ico",
        "/img/icons/mstile-150x150.png",
        "/img/icons/safari-pinned-tab.svg",
        "/img/logo/logo.png",
        "/img/logo/tmdb-logo.svg",
        "/img/gr-stocks-q8P8YoR6erg-unsplash.jpg",
        "/manifest.json",
        "https://fonts.googleapis.com/icon?family=Material+Icons",
        "https://fonts.gstatic.com/s/materialicons/v82/flUhRq6tzZclQEJ-Vdg-IuiaDsNcIhQ8tQ.woff2",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_max_dynamic_entries() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    "cinecache/0.1".into()
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            static_cache: default_static_cache(),
            dynamic_cache: default_dynamic_cache(),
            offline_url: default_offline_url(),
            static_assets: default_static_assets(),
            max_dynamic_entries: default_max_dynamic_entries(),
            navigation_preload: true,
            user_agent: default_user_agent(),
            timeout_ms: None,
            tmdb_api_key: None,
            tmdb_base_url: default_tmdb_base_url(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CINECACHE_`
    /// 2. TOML file from `CINECACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("CINECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CINECACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Resolve a manifest entry against the origin.
    pub fn resolve(&self, entry: &str) -> Result<Url, ConfigError> {
        let origin = self.origin_url()?;
        origin
            .join(entry)
            .map_err(|e| ConfigError::Invalid { field: "static_assets".into(), reason: format!("{entry}: {e}") })
    }

    /// Build the generation the worker installs from this configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if any URL fails to resolve.
    pub fn generation(&self) -> Result<GenerationConfig, ConfigError> {
        let manifest = self
            .static_assets
            .iter()
            .map(|entry| self.resolve(entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GenerationConfig {
            static_cache: self.static_cache.clone(),
            dynamic_cache: self.dynamic_cache.clone(),
            manifest,
            offline_url: self.resolve(&self.offline_url)?,
            max_dynamic_entries: self.max_dynamic_entries,
            navigation_preload: self.navigation_preload,
        })
    }

    /// Check if the TMDB API key is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the TMDB API key is not set.
    pub fn require_tmdb_api_key(&self) -> Result<&str, ConfigError> {
        self.tmdb_api_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "tmdb_api_key".into(),
            hint: "Set CINECACHE_TMDB_API_KEY environment variable".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./cinecache.sqlite"));
        assert_eq!(config.static_cache, "static-v3");
        assert_eq!(config.dynamic_cache, "dynamic-3");
        assert_eq!(config.offline_url, "/404.html");
        assert_eq!(config.max_dynamic_entries, 50);
        assert!(config.navigation_preload);
        assert!(config.timeout_ms.is_none());
        assert!(config.tmdb_api_key.is_none());
        assert_eq!(config.static_assets.len(), 21);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), None);

        let config = AppConfig { timeout_ms: Some(5_000), ..Default::default() };
        assert_eq!(config.timeout(), Some(Duration::from_millis(5_000)));
    }

    #[test]
    fn test_generation_resolves_against_origin() {
        let config = AppConfig::default();
        let generation = config.generation().unwrap();

        assert_eq!(generation.manifest[0].as_str(), "http://localhost:5500/");
        assert_eq!(generation.offline_url.as_str(), "http://localhost:5500/404.html");
        assert!(
            generation
                .manifest
                .iter()
                .any(|u| u.host_str() == Some("fonts.gstatic.com"))
        );
        assert_eq!(generation.max_dynamic_entries, 50);
    }

    #[test]
    fn test_generation_bad_origin() {
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        assert!(matches!(config.generation(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_require_tmdb_api_key_missing() {
        let config = AppConfig::default();
        let result = config.require_tmdb_api_key();
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_tmdb_api_key_present() {
        let config = AppConfig { tmdb_api_key: Some("test-key".into()), ..Default::default() };
        assert_eq!(config.require_tmdb_api_key().unwrap(), "test-key");
    }
}
