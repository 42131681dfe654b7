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

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_dynamic_entries` is 0
    /// - a partition name is empty, or both partitions share a name
    /// - `offline_url` is not part of `static_assets`
    /// - `origin` or a manifest entry does not resolve to a URL
    /// - `timeout_ms` is set below 100ms or above 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dynamic_entries == 0 {
            return Err(ConfigError::Invalid {
                field: "max_dynamic_entries".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.static_cache.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "static_cache".into(), reason: "must not be empty".into() });
        }
        if self.dynamic_cache.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "dynamic_cache".into(), reason: "must not be empty".into() });
        }
        if self.static_cache == self.dynamic_cache {
            return Err(ConfigError::Invalid {
                field: "dynamic_cache".into(),
                reason: "must differ from static_cache".into(),
            });
        }

        let generation = self.generation()?;
        if !generation.manifest.contains(&generation.offline_url) {
            return Err(ConfigError::Invalid {
                field: "offline_url".into(),
                reason: format!("{} is not listed in static_assets", self.offline_url),
            });
        }

        if let Some(timeout_ms) = self.timeout_ms {
            if timeout_ms < 100 {
                return Err(ConfigError::Invalid {
                    field: "timeout_ms".into(),
                    reason: "must be at least 100ms".into(),
                });
            }
            if timeout_ms > 300_000 {
                return Err(ConfigError::Invalid {
                    field: "timeout_ms".into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.max_dynamic_entries < 10 {
            tracing::warn!(
                max_dynamic_entries = self.max_dynamic_entries,
                "Very small dynamic cache ceiling; most runtime fetches will be evicted quickly"
            );
        }

        Ok(())
    }
}
