//! Structured logging configuration.

use crate::config::LoggingSettings;
use crate::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(Error::InvalidInput(format!("unknown log format: {other}"))),
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Filter directive passed to [`EnvFilter`].
    pub filter: String,
    /// Log file; stderr when `None`.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from config settings.
    ///
    /// Filter precedence: `RUST_LOG`, then `[logging] filter`, then `debug`
    /// when `verbose` or `info` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the format name is unknown.
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Result<Self> {
        let rust_log = std::env::var(EnvFilter::DEFAULT_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty());
        Self::resolve(settings, verbose, rust_log)
    }

    fn resolve(settings: &LoggingSettings, verbose: bool, rust_log: Option<String>) -> Result<Self> {
        let format = settings
            .format
            .as_deref()
            .map(LogFormat::from_str)
            .transpose()?
            .unwrap_or_default();
        let default_filter = if verbose { "debug" } else { "info" };
        let filter = rust_log
            .or_else(|| settings.filter.clone())
            .unwrap_or_else(|| default_filter.to_string());

        Ok(Self {
            format,
            filter,
            file: settings.file.clone(),
        })
    }

    /// Builds the [`EnvFilter`] for this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter directive does not parse.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.filter)
            .map_err(|e| Error::InvalidInput(format!("invalid log filter '{}': {e}", self.filter)))
    }
}
