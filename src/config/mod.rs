//! Configuration management for the daylog application.
//!
//! This module handles loading and validating configuration settings from
//! environment variables, with sensible defaults.
//!
//! # Environment Variables
//!
//! - `DAYLOG_DIR`: Directory holding the stored documents (defaults to ~/.daylog)
//! - `DAYLOG_LOG_FORMAT`: `json` for structured logs, anything else for plain text
//! - `HOME`: Used for expanding the default data directory path

use crate::constants::{DEFAULT_DATA_DIR, ENV_DATA_DIR, ENV_LOG_FORMAT};
use crate::errors::{AppError, AppResult};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    fn from_env_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Configuration for the daylog application.
///
/// # Examples
///
/// ```
/// use daylog::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     data_dir: PathBuf::from("/path/to/daylog"),
/// };
/// assert!(config.validate().is_ok());
/// ```
pub struct Config {
    /// Directory where the todos and journal documents are stored.
    pub data_dir: PathBuf,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("data_dir", &"[REDACTED_PATH]")
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(""),
        }
    }
}

impl Config {
    /// Reads the log format on its own, so logging can start before the
    /// data directory configuration is loaded and validated.
    pub fn log_format_from_env() -> LogFormat {
        env::var(ENV_LOG_FORMAT)
            .map(|v| LogFormat::from_env_value(&v))
            .unwrap_or_default()
    }

    /// Loads configuration from environment variables with sensible defaults.
    ///
    /// The data directory path is expanded with `shellexpand`, so `~` and
    /// environment variable references work.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if path expansion fails or the resulting
    /// path is empty.
    pub fn load() -> AppResult<Self> {
        let data_dir_str = env::var(ENV_DATA_DIR).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());

        let expanded_path = shellexpand::full(&data_dir_str)
            .map_err(|e| AppError::Config(format!("Failed to expand path: {}", e)))?;

        let data_dir = PathBuf::from(expanded_path.into_owned());

        if data_dir.as_os_str().is_empty() {
            return Err(AppError::Config("Data directory path is empty".to_string()));
        }

        Ok(Config { data_dir })
    }

    /// Validates that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` with one of the following messages:
    /// - "Data directory path is empty"
    /// - "Data directory must be an absolute path"
    pub fn validate(&self) -> AppResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(AppError::Config("Data directory path is empty".to_string()));
        }

        if !self.data_dir.is_absolute() {
            return Err(AppError::Config(
                "Data directory must be an absolute path".to_string(),
            ));
        }

        Ok(())
    }
}
