//! Configuration management for the platform binary.
//!
//! This module handles loading and validation of the TOML configuration file
//! and its conversion into the settings the library crates consume.

use platform_data::cache::CacheSettings;
use platform_data::database::DatabaseSettings;
use platform_data::DataSettings;
use platform_events::PatternSyntax;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration, one table per concern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub site: SiteSettings,
    #[serde(default)]
    pub events: EventSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub plugins: PluginSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Site-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
    /// Public root URL, ending in `/`
    #[serde(default = "default_wwwroot")]
    pub wwwroot: String,
}

fn default_wwwroot() -> String {
    DataSettings::default().wwwroot
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            wwwroot: default_wwwroot(),
        }
    }
}

/// Event system settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSettings {
    /// `legacy` or `strict` wildcard handling
    #[serde(default)]
    pub pattern_syntax: PatternSyntax,
}

/// Plugin settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Plugins to boot, in boot order
    #[serde(default)]
    pub enabled: Vec<String>,
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
    /// Per-target level overrides, e.g. `platform_data = "debug"`
    #[serde(default)]
    pub targets: BTreeMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            targets: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from `path`, writing the defaults there first if
    /// the file does not exist.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let default_config = AppConfig::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            info!("📝 Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.wwwroot.is_empty() {
            return Err(ConfigError::Invalid("site.wwwroot cannot be empty".to_string()));
        }
        if !self.site.wwwroot.ends_with('/') {
            return Err(ConfigError::Invalid(format!(
                "site.wwwroot must end with '/': {}",
                self.site.wwwroot
            )));
        }

        if self.database.engine.is_empty() {
            return Err(ConfigError::Invalid("database.engine cannot be empty".to_string()));
        }
        if self.database.links.is_empty() {
            return Err(ConfigError::Invalid(
                "database.links needs at least one link".to_string(),
            ));
        }

        for (index, name) in self.plugins.enabled.iter().enumerate() {
            if self.plugins.enabled[..index].contains(name) {
                return Err(ConfigError::Invalid(format!("Plugin {name} is enabled twice")));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            )));
        }
        for (target, level) in &self.logging.targets {
            if !valid_levels.contains(&level.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Invalid log level for {target}: {level}"
                )));
            }
        }

        Ok(())
    }

    pub fn data_settings(&self) -> DataSettings {
        DataSettings {
            wwwroot: self.site.wwwroot.clone(),
            database: self.database.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.events.pattern_syntax, PatternSyntax::Legacy);
        assert_eq!(config.data_settings(), DataSettings::default());
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [events]
            pattern_syntax = "strict"

            [plugins]
            enabled = ["audit"]
            "#,
        )
        .unwrap();

        assert_eq!(config.events.pattern_syntax, PatternSyntax::Strict);
        assert_eq!(config.plugins.enabled, vec!["audit"]);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.database.engine, "memory");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.site.wwwroot = "http://example.org".to_string();
        assert!(config.validate().is_err());

        config.site.wwwroot = "http://example.org/".to_string();
        config.plugins.enabled = vec!["audit".to_string(), "audit".to_string()];
        assert!(config.validate().is_err());

        config.plugins.enabled.pop();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        config.logging.targets.insert("platform_data".to_string(), "chatty".to_string());
        assert!(config.validate().is_err());

        config.logging.targets.clear();
        config.database.links.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("platform.toml");

        let created = AppConfig::load_from_file(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, AppConfig::default());

        let reloaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(reloaded, created);
    }
}
