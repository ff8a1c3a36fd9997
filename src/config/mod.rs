//! Configuration management.
//!
//! Configuration comes from a TOML file (optional) with environment
//! overrides on top. Paths under the data directory are derived from it
//! unless set explicitly.

use crate::io::services::import::{DEFAULT_IMPORT_PASSWORD, DEFAULT_MAX_UPLOAD_KB};
use crate::io::{ExportOptions, ImportOptions};
use crate::services::{DEFAULT_PER_PAGE, PasswordHasher};
use crate::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "USERDESK_CONFIG_PATH";

const DEFAULT_DATA_DIR: &str = ".userdesk";

/// Main configuration for userdesk.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// Root directory for the database, uploads and exports.
    pub data_dir: PathBuf,
    /// Explicit database path; defaults to `<data_dir>/userdesk.db`.
    pub database_path: Option<PathBuf>,
    /// Explicit imports directory; defaults to `<data_dir>/imports`.
    pub imports_dir: Option<PathBuf>,
    /// Explicit exports directory; defaults to `<data_dir>/private/exports`.
    pub exports_dir: Option<PathBuf>,
    /// Users per page on the listing.
    pub per_page: usize,
    /// Largest accepted upload, in kilobytes.
    pub max_upload_kb: u64,
    /// Password for imported rows without one.
    pub default_import_password: String,
    /// Password hashing cost.
    pub password: PasswordSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Metrics settings.
    pub metrics: MetricsSettings,
}

/// Password hashing cost settings (`[password]`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordSettings {
    /// Argon2 memory cost in KiB.
    pub memory_kib: Option<u32>,
    /// Argon2 iteration count.
    pub iterations: Option<u32>,
}

/// Logging settings (`[logging]`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// `tracing-subscriber` filter directive, e.g. `info,userdesk=debug`.
    pub filter: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Metrics settings (`[metrics]`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSettings {
    /// Whether the Prometheus exporter is installed.
    pub enabled: Option<bool>,
    /// Port for the Prometheus scrape listener.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Listen address.
    pub listen_addr: Option<String>,
    /// Data directory.
    pub data_dir: Option<String>,
    /// Database path.
    pub database_path: Option<String>,
    /// Imports directory.
    pub imports_dir: Option<String>,
    /// Exports directory.
    pub exports_dir: Option<String>,
    /// Users per page.
    pub per_page: Option<usize>,
    /// Upload cap in kilobytes.
    pub max_upload_kb: Option<u64>,
    /// Default password for imported rows.
    pub default_import_password: Option<String>,
    /// Password hashing section.
    pub password: Option<PasswordSettings>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
    /// Metrics section.
    pub metrics: Option<MetricsSettings>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            database_path: None,
            imports_dir: None,
            exports_dir: None,
            per_page: DEFAULT_PER_PAGE,
            max_upload_kb: DEFAULT_MAX_UPLOAD_KB,
            default_import_password: DEFAULT_IMPORT_PASSWORD.to_string(),
            password: PasswordSettings::default(),
            logging: LoggingSettings::default(),
            metrics: MetricsSettings::default(),
        }
    }
}

impl AppConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration and applies environment overrides.
    ///
    /// Checks, in order: `explicit`, `USERDESK_CONFIG_PATH`, then the default
    /// locations (see [`Self::load_default`]).
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be read or parsed,
    /// or if an environment override is malformed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let mut config = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::load_default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::operation("read_config_file", format!("{}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for [`ConfigFile`] or
    /// a value is out of range.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| Error::operation("parse_config_file", e))?;
        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/userdesk/` on macOS)
    /// 2. XDG config dir (`~/.config/userdesk/` for Unix compatibility)
    ///
    /// Returns default configuration if no readable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("userdesk").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("userdesk")
                .join("config.toml"),
        ];
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                },
            }
        }

        Self::default()
    }

    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = file.listen_addr {
            config.listen_addr = parse_addr(&addr)?;
        }
        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        config.database_path = file.database_path.map(PathBuf::from);
        config.imports_dir = file.imports_dir.map(PathBuf::from);
        config.exports_dir = file.exports_dir.map(PathBuf::from);
        if let Some(per_page) = file.per_page {
            config.per_page = per_page.max(1);
        }
        if let Some(kb) = file.max_upload_kb {
            config.max_upload_kb = kb;
        }
        if let Some(password) = file.default_import_password {
            config.default_import_password = password;
        }
        config.password = file.password.unwrap_or_default();
        config.logging = file.logging.unwrap_or_default();
        config.metrics = file.metrics.unwrap_or_default();

        Ok(config)
    }

    /// Applies `USERDESK_*` overrides read through `lookup`.
    ///
    /// Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a malformed address, port or flag.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(addr) = get("USERDESK_ADDR") {
            self.listen_addr = parse_addr(&addr)?;
        }
        if let Some(dir) = get("USERDESK_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(db) = get("USERDESK_DATABASE") {
            self.database_path = Some(PathBuf::from(db));
        }
        if let Some(format) = get("USERDESK_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Some(enabled) = get("USERDESK_METRICS_ENABLED") {
            self.metrics.enabled = Some(parse_bool(&enabled)?);
        }
        if let Some(port) = get("USERDESK_METRICS_PORT") {
            self.metrics.port = Some(port.parse().map_err(|_| {
                Error::InvalidInput(format!("USERDESK_METRICS_PORT is not a port: {port}"))
            })?);
        }
        Ok(())
    }

    /// Returns the database path.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("userdesk.db"))
    }

    /// Returns the directory uploads are staged in.
    #[must_use]
    pub fn imports_dir(&self) -> PathBuf {
        self.imports_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("imports"))
    }

    /// Returns the directory exports are written to.
    #[must_use]
    pub fn exports_dir(&self) -> PathBuf {
        self.exports_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("private").join("exports"))
    }

    /// Builds the password hasher for the configured cost.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if Argon2 rejects the cost.
    pub fn password_hasher(&self) -> Result<PasswordHasher> {
        match (self.password.memory_kib, self.password.iterations) {
            (None, None) => Ok(PasswordHasher::new()),
            (memory, iterations) => PasswordHasher::with_cost(
                memory.unwrap_or(argon2::Params::DEFAULT_M_COST),
                iterations.unwrap_or(argon2::Params::DEFAULT_T_COST),
            ),
        }
    }

    /// Builds import options from this configuration.
    #[must_use]
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions::default()
            .with_imports_dir(self.imports_dir())
            .with_max_upload_kb(self.max_upload_kb)
            .with_default_password(self.default_import_password.clone())
    }

    /// Builds export options from this configuration.
    #[must_use]
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions::default().with_exports_dir(self.exports_dir())
    }
}

fn parse_addr(value: &str) -> Result<SocketAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("invalid listen address: {value}")))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidInput(format!("invalid boolean: {value}"))),
    }
}
