use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration structure for pollgate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Polling defaults applied to sources that do not set their own policy
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file holding trigger state
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".pollgate/state.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// `SQLite` connection URL for [`Self::path`].
    pub fn url(&self) -> String {
        if self.path.starts_with("sqlite:") {
            self.path.clone()
        } else {
            format!("sqlite:{}", self.path)
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Rotation policy for file logs
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

/// Integration-level polling defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PollingConfig {
    /// Maximum pages fetched per tick
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Delay between page fetches within one tick, in milliseconds
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,

    /// Interval between ticks for `pollgate watch`, in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

const fn default_max_pages() -> u32 {
    10
}

const fn default_pace_ms() -> u64 {
    100
}

const fn default_interval_secs() -> u64 {
    300
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            pace_ms: default_pace_ms(),
            interval_secs: default_interval_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url() {
        let mut db = DatabaseConfig::default();
        assert_eq!(db.url(), "sqlite:.pollgate/state.db");
        db.path = "sqlite::memory:".to_string();
        assert_eq!(db.url(), "sqlite::memory:");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("polling:\n  max_pages: 3\n").unwrap();
        assert_eq!(config.polling.max_pages, 3);
        assert_eq!(config.polling.pace_ms, 100);
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
