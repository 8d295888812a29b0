//! Environment-driven runtime configuration.
//!
//! # Invariants
//! - Values are trimmed; blank values fall back to defaults.
//! - `log_level` is always one of `trace|debug|info|warn|error`.

use crate::logging::{default_log_level, LogLevel};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "CANNALOG_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "CANNALOG_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "CANNALOG_LOG_DIR";
const DEFAULT_DB_FILE_NAME: &str = "cannalog.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel { key, value } => write!(
                f,
                "{key}=`{value}` is not a log level; expected trace|debug|info|warn|error"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_level: LogLevel,
    /// File logging stays off when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Reads `CANNALOG_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(DB_PATH_ENV) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(LOG_LEVEL_ENV) {
            config.log_level = LogLevel::parse(&level).ok_or(ConfigError::InvalidLogLevel {
                key: LOG_LEVEL_ENV,
                value: level,
            })?;
        }
        config.log_dir = read(LOG_DIR_ENV).map(PathBuf::from);
        Ok(config)
    }
}
