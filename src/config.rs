// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the explorer data layer.
//!
//! The layout mirrors the `app.yaml` served by the config endpoint. Every field
//! has a default, so partial files (or an empty one) are valid.
//!
//! # Example
//!
//! ```
//! use pharmalink_explorer::config::{DataSource, ExplorerConfig, ResolvedSource};
//!
//! // Minimal config (uses defaults)
//! let config = ExplorerConfig::default();
//! assert_eq!(config.data.retry_attempts, 3);
//! assert_eq!(config.data_source(), ResolvedSource::Local); // development → local
//!
//! let yaml = "
//! app:
//!   environment: production
//! data:
//!   timeout: 2500
//! ";
//! let config = ExplorerConfig::from_yaml_str(yaml).unwrap();
//! assert_eq!(config.data.source, DataSource::Auto);
//! assert_eq!(config.data_source(), ResolvedSource::Api);
//! assert_eq!(config.data.timeout, 2500);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

/// Where product documents come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Local in development, API everywhere else
    #[default]
    Auto,
    Local,
    Api,
}

/// [`DataSource`] after resolving `Auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedSource {
    Local,
    Api,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_app_version")]
    pub version: String,
    #[serde(default = "default_app_description")]
    pub description: String,
    #[serde(default)]
    pub environment: Environment,
}

fn default_app_name() -> String { "PharmaLink Explorer".into() }
fn default_app_version() -> String { "v1.2.3".into() }
fn default_app_description() -> String {
    "Digitale Informationen für die pharmazeutische Lieferkette".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
            description: default_app_description(),
            environment: Environment::default(),
        }
    }
}

/// Backend endpoints. Relative paths are resolved against `origin`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Scheme and host the relative endpoint paths live under
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_config_url")]
    pub config_url: String,
    #[serde(default = "default_documentation_url")]
    pub documentation_url: String,
    #[serde(default = "default_backend_version_url")]
    pub backend_version_url: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default = "default_history_url")]
    pub history_url: String,
}

fn default_origin() -> String { "http://localhost:3000".into() }
fn default_config_url() -> String { "/api/config".into() }
fn default_documentation_url() -> String { "/api-docs".into() }
fn default_backend_version_url() -> String { "/api/version".into() }
fn default_base_url() -> String { "/api/v1".into() }
fn default_search_url() -> String { "/api/v1/search".into() }
fn default_history_url() -> String { "/api/v1/history".into() }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            config_url: default_config_url(),
            documentation_url: default_documentation_url(),
            backend_version_url: default_backend_version_url(),
            base_url: default_base_url(),
            search_url: default_search_url(),
            history_url: default_history_url(),
        }
    }
}

/// Request behaviour. Durations are milliseconds, as in `app.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub source: DataSource,
    /// Per-attempt timeout (ms)
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Total tries per request (values below 1 act as 1)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Request-level cache lifetime (ms)
    #[serde(default = "default_cache_duration")]
    pub cache_duration: u64,
}

fn default_timeout() -> u64 { 10_000 }
fn default_retry_attempts() -> u32 { 3 }
fn default_cache_duration() -> u64 { 300_000 } // 5 minutes

impl DataConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    #[must_use]
    pub fn cache_duration(&self) -> Duration {
        Duration::from_millis(self.cache_duration)
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: DataSource::default(),
            timeout: default_timeout(),
            retry_attempts: default_retry_attempts(),
            cache_duration: default_cache_duration(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(default = "default_primary_color")]
    pub primary_color: String,
    #[serde(default = "default_header_height")]
    pub header_height: String,
    #[serde(default = "default_mobile_header_height")]
    pub mobile_header_height: String,
}

fn default_primary_color() -> String { "emerald".into() }
fn default_header_height() -> String { "20".into() }
fn default_mobile_header_height() -> String { "16".into() }

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            primary_color: default_primary_color(),
            header_height: default_header_height(),
            mobile_header_height: default_mobile_header_height(),
        }
    }
}

/// Presentation settings, carried through for consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default)]
    pub qr_scanner: bool,
    #[serde(default)]
    pub search_history: bool,
    #[serde(default)]
    pub offline_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    #[serde(default = "default_support_url")]
    pub support_url: String,
    #[serde(default = "default_anchor")]
    pub privacy_url: String,
    #[serde(default = "default_anchor")]
    pub terms_url: String,
}

fn default_support_url() -> String { "https://vercel.com/help".into() }
fn default_anchor() -> String { "#".into() }

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            support_url: default_support_url(),
            privacy_url: default_anchor(),
            terms_url: default_anchor(),
        }
    }
}

/// Background cache warming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreloadConfig {
    /// Ids warmed first by `start_preloading`
    #[serde(default = "default_common_ids")]
    pub common_ids: Vec<String>,
    /// Hops of linked ids to follow (0 disables fan-out, capped at 1)
    #[serde(default = "default_linked_data_depth")]
    pub linked_data_depth: u8,
    #[serde(default = "default_true")]
    pub preload_on_idle: bool,
    /// Delay before an idle start (ms)
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,
    /// Debounce before draining the queue (ms)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Queue drain concurrency
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_common_ids() -> Vec<String> {
    vec!["MED-1".into(), "HERSTELLER-1".into(), "UNIT-1".into()]
}
fn default_linked_data_depth() -> u8 { 1 }
fn default_true() -> bool { true }
fn default_idle_delay_ms() -> u64 { 2_000 }
fn default_debounce_ms() -> u64 { 500 }
fn default_max_concurrent() -> usize { 5 }

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            common_ids: default_common_ids(),
            linked_data_depth: default_linked_data_depth(),
            preload_on_idle: default_true(),
            idle_delay_ms: default_idle_delay_ms(),
            debounce_ms: default_debounce_ms(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Runtime housekeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Expired-entry sweep interval (seconds, 0 = disabled)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Delivery handoffs younger than this count as in transit (hours)
    #[serde(default = "default_in_transit_hours")]
    pub delivery_in_transit_hours: u64,
}

fn default_cleanup_interval_secs() -> u64 { 60 }
fn default_in_transit_hours() -> u64 { 24 }

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: default_cleanup_interval_secs(),
            delivery_in_transit_hours: default_in_transit_hours(),
        }
    }
}

/// Configuration for the explorer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub preload: PreloadConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

impl ExplorerConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load from a `.json` or YAML file (anything not ending in `.json`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        }
    }

    /// Load from `path`, falling back to defaults with a warning.
    #[must_use]
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::from_file(path) {
            Ok(config) => {
                info!(path = %path.display(), "Config loaded");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load config, falling back to defaults");
                Self::default()
            }
        }
    }

    /// Resolve `Auto` against the app environment.
    #[must_use]
    pub fn data_source(&self) -> ResolvedSource {
        match self.data.source {
            DataSource::Local => ResolvedSource::Local,
            DataSource::Api => ResolvedSource::Api,
            DataSource::Auto if self.app.environment == Environment::Development => {
                ResolvedSource::Local
            }
            DataSource::Auto => ResolvedSource::Api,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ExplorerConfig::default();
        assert_eq!(config.app.name, "PharmaLink Explorer");
        assert_eq!(config.api.search_url, "/api/v1/search");
        assert_eq!(config.data.timeout(), Duration::from_secs(10));
        assert_eq!(config.data.cache_duration(), Duration::from_secs(300));
        assert_eq!(config.preload.common_ids, vec!["MED-1", "HERSTELLER-1", "UNIT-1"]);
        assert_eq!(config.preload.max_concurrent, 5);
        assert!(!config.features.qr_scanner);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = ExplorerConfig::from_yaml_str("").unwrap();
        assert_eq!(config.data.retry_attempts, 3);
    }

    #[test]
    fn test_partial_json() {
        let config = ExplorerConfig::from_json_str(
            r#"{"data": {"source": "api", "retry_attempts": 5}, "features": {"offline_mode": true}}"#,
        )
        .unwrap();
        assert_eq!(config.data.source, DataSource::Api);
        assert_eq!(config.data.retry_attempts, 5);
        assert_eq!(config.data.timeout, 10_000);
        assert!(config.features.offline_mode);
    }

    #[test]
    fn test_data_source_resolution() {
        let mut config = ExplorerConfig::default();
        assert_eq!(config.data_source(), ResolvedSource::Local);

        config.app.environment = Environment::Staging;
        assert_eq!(config.data_source(), ResolvedSource::Api);

        config.data.source = DataSource::Local;
        assert_eq!(config.data_source(), ResolvedSource::Local);
    }

    #[test]
    fn test_invalid_yaml() {
        let result = ExplorerConfig::from_yaml_str("data: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("app.yaml");
        let mut file = std::fs::File::create(&yaml_path).unwrap();
        writeln!(file, "data:\n  source: local\n  timeout: 100").unwrap();
        let config = ExplorerConfig::from_file(&yaml_path).unwrap();
        assert_eq!(config.data.timeout, 100);

        let json_path = dir.path().join("app.json");
        std::fs::write(&json_path, r#"{"app": {"environment": "production"}}"#).unwrap();
        let config = ExplorerConfig::from_file(&json_path).unwrap();
        assert_eq!(config.app.environment, Environment::Production);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ExplorerConfig::load_or_default("/definitely/not/here.yaml");
        assert_eq!(config.app.version, "v1.2.3");
    }
}
