//! Core runtime configuration.
//!
//! Hosts hand the core a JSON document; every field is optional and falls
//! back to the defaults below.

use crate::logging::LoggingError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the local database inside the app data directory.
pub const DB_FILE_NAME: &str = "tasky.sqlite3";
/// Period of the background sync pass.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_millis(15_000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Local database file. `None` runs without durable storage: reads are
    /// empty and writes are dropped.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Absolute directory for rolling log files. `None` leaves logging off.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            sync_interval_ms: default_sync_interval_ms(),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

fn default_sync_interval_ms() -> u64 {
    DEFAULT_SYNC_INTERVAL.as_millis() as u64
}

fn default_log_level() -> String {
    crate::logging::default_log_level().to_string()
}

impl CoreConfig {
    /// Defaults with the database at `<data_dir>/tasky.sqlite3`.
    pub fn in_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            db_path: Some(data_dir.as_ref().join(DB_FILE_NAME)),
            ..Self::default()
        }
    }

    /// Parses and validates a JSON config document.
    ///
    /// # Errors
    /// - [`ConfigError::Parse`] for malformed JSON or wrong field types.
    /// - Any error reported by [`CoreConfig::validate`].
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync_interval_ms == 0 {
            return Err(ConfigError::ZeroSyncInterval);
        }
        if self
            .db_path
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            return Err(ConfigError::EmptyDbPath);
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    ZeroSyncInterval,
    EmptyDbPath,
    /// `log_dir` is set but logging could not start with it.
    Logging(LoggingError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
            Self::ZeroSyncInterval => write!(f, "sync_interval_ms must be greater than 0"),
            Self::EmptyDbPath => write!(f, "db_path cannot be empty"),
            Self::Logging(err) => write!(f, "logging config rejected: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::ZeroSyncInterval | Self::EmptyDbPath => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<LoggingError> for ConfigError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}
