use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Project config file, relative to the working directory.
pub const CONFIG_FILE: &str = "pollgate.yaml";
/// Uncommitted local overrides.
pub const LOCAL_CONFIG_FILE: &str = "pollgate.local.yaml";
pub const ENV_PREFIX: &str = "POLLGATE_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid max_pages: {0}. Must be at least 1")]
    InvalidMaxPages(u32),

    #[error("Invalid interval_secs: {0}. Must be at least 1")]
    InvalidInterval(u64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. pollgate.yaml
    /// 3. pollgate.local.yaml (optional)
    /// 4. Environment variables (POLLGATE_* prefix, `__` separates levels)
    pub fn load() -> Result<Config> {
        Self::load_from(None)
    }

    /// Like [`Self::load`], but an explicit `path` replaces the two
    /// project files.
    pub fn load_from(path: Option<&Path>) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        figment = match path {
            Some(path) => figment.merge(Yaml::file(path)),
            None => figment
                .merge(Yaml::file(CONFIG_FILE))
                .merge(Yaml::file(LOCAL_CONFIG_FILE)),
        };

        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.polling.max_pages == 0 {
            return Err(ConfigError::InvalidMaxPages(config.polling.max_pages));
        }

        if config.polling.interval_secs == 0 {
            return Err(ConfigError::InvalidInterval(config.polling.interval_secs));
        }

        Ok(())
    }
}
