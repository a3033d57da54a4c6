//! Configuration management for the index host.
//!
//! Settings are loaded from a TOML file; a default file is written when
//! none exists yet.

use crate::cli::CliArgs;
use serde::{Deserialize, Serialize};
use spatial_index::IndexConfig;
use std::path::Path;
use tracing::info;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Shape and store keys of the index
    pub index: IndexConfig,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Entries loaded at startup
    #[serde(default)]
    pub seed: SeedSettings,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Startup seeding configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedSettings {
    /// JSON file holding an array of `{ "id", "coordinates" }` entries
    pub path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            index: IndexConfig::new(2, "subspace:ships:z", "subspace:ships:members")
                .with_precision(32),
            logging: LoggingSettings::default(),
            seed: SeedSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration there and
    /// returns it.
    pub async fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of file values
    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        if let Some(seed) = &args.seed_path {
            self.seed.path = Some(seed.to_string_lossy().to_string());
        }
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), String> {
        self.index.validate().map_err(|e| e.to_string())?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        if matches!(&self.seed.path, Some(p) if p.is_empty()) {
            return Err("Seed path cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.index.dimensions, 2);
        assert_eq!(config.index.precision, 32);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.seed.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.index.collection_key, "subspace:ships:z");
        assert!(path.exists());

        // The written file loads back to the same values
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.index, config.index);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[index]
dimensions = 3
collection_key = "world:z"
hash_key = "world:h"

[logging]
level = "debug"
json_format = true

[seed]
path = "entities.json"
"#;

        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.index.dimensions, 3);
        assert_eq!(config.index.precision, 64);
        assert_eq!(config.index.hash_key, "world:h");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert_eq!(config.seed.path.as_deref(), Some("entities.json"));
    }

    #[tokio::test]
    async fn test_logging_and_seed_sections_optional() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(
            temp_file.path(),
            "[index]\ndimensions = 2\nprecision = 8\ncollection_key = \"z\"\nhash_key = \"h\"\n",
        )
        .await
        .unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(config.seed.path.is_none());
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            config_path: PathBuf::from("index.toml"),
            log_level: Some("trace".to_string()),
            json_logs: true,
            seed_path: Some(PathBuf::from("seed.json")),
            query: None,
        };
        config.apply_overrides(&args);
        assert_eq!(config.logging.level, "trace");
        assert!(config.logging.json_format);
        assert_eq!(config.seed.path.as_deref(), Some("seed.json"));
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().unwrap_err().contains("Invalid log level"));

        let mut config = AppConfig::default();
        config.index.dimensions = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.seed.path = Some(String::new());
        assert!(config.validate().is_err());
    }
}
