use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Default project config file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "lk-api.yaml";

/// Optional local overrides, relative to the working directory.
pub const LOCAL_CONFIG_FILE: &str = "lk-api.local.yaml";

/// Prefix for environment overrides. Nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "LK_API_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid cache ttl_ms: {0}. Must be positive")]
    InvalidCacheTtl(u64),

    #[error("Invalid cache cleanup_interval_ms: {0}. Must be positive")]
    InvalidCleanupInterval(u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `lk-api.yaml`, or the file passed on the command line
    /// 3. `lk-api.local.yaml` (optional local overrides)
    /// 4. Environment variables (`LK_API_*`, highest priority)
    pub fn load(config_file: Option<&Path>) -> Result<Config> {
        let config_file = config_file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        let config: Config = Self::figment(config_file)
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, ignoring local overrides and
    /// the environment.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// The full provider stack, before extraction.
    pub fn figment(config_file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(config_file))
            .merge(Yaml::file(LOCAL_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.server.host.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("server host cannot be empty".to_string()));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        if config.cache.ttl_ms == 0 {
            return Err(ConfigError::InvalidCacheTtl(config.cache.ttl_ms));
        }

        if config.cache.cleanup_interval_ms == 0 {
            return Err(ConfigError::InvalidCleanupInterval(config.cache.cleanup_interval_ms));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
