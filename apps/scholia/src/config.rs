//! # Configuration
//!
//! `scholia.toml` settings for the binary. Every key is optional:
//!
//! ```toml
//! database = "scholia.redb"
//! log_format = "json"          # or "text"
//! log_filter = "scholia=debug"
//! ```
//!
//! Precedence, lowest first: built-in defaults, the config file,
//! `SCHOLIA_LOG_FORMAT`, command-line flags.

use scholia_core::ScholiaError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Config file read when `--config` is not given. A missing default file
/// is not an error.
pub const DEFAULT_CONFIG_PATH: &str = "scholia.toml";

/// Environment variable overriding `log_format`.
pub const LOG_FORMAT_ENV: &str = "SCHOLIA_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Result<Self, ScholiaError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ScholiaError::SerializationError(format!(
                "unknown log format '{}', expected 'text' or 'json'",
                other
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

/// Settings for one invocation of the binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database: PathBuf,
    pub log_format: LogFormat,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("scholia.redb"),
            log_format: LogFormat::Text,
            log_filter: "scholia=info".to_string(),
        }
    }
}

impl Config {
    /// Parse and validate TOML text.
    pub fn from_toml(raw: &str) -> Result<Self, ScholiaError> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| ScholiaError::SerializationError(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or from [`DEFAULT_CONFIG_PATH`] when `None`.
    ///
    /// An explicit path must exist. A missing default file yields the
    /// defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ScholiaError> {
        let (path, explicit) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        };
        if !path.exists() {
            if explicit {
                return Err(ScholiaError::IoError(format!(
                    "Config file '{}' does not exist",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScholiaError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    /// Apply a `SCHOLIA_LOG_FORMAT` value, if set.
    pub fn with_log_format_override(mut self, raw: Option<&str>) -> Result<Self, ScholiaError> {
        if let Some(raw) = raw {
            self.log_format = LogFormat::parse(raw)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ScholiaError> {
        if self.database.as_os_str().is_empty() {
            return Err(ScholiaError::SerializationError(
                "Config 'database' must not be empty".to_string(),
            ));
        }
        EnvFilter::try_new(&self.log_filter).map_err(|e| {
            ScholiaError::SerializationError(format!(
                "Invalid log_filter '{}': {}",
                self.log_filter, e
            ))
        })?;
        Ok(())
    }
}
