//! Configuration management for pgsieve.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the directory under `base_dir` holding rule and output documents.
pub const DICT_DIR: &str = "dict";

/// Main application configuration.
///
/// This is loaded from `~/.config/pgsieve/config.toml` (or platform equivalent)
/// unless an explicit path is given. If the default file doesn't exist,
/// default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General application settings
    pub general: GeneralConfig,
    /// Connection settings for the scanned database
    pub database: DatabaseConfig,
    /// Scanning behavior settings
    pub scanning: ScanningConfig,
    /// Rule and output document locations
    pub paths: PathsConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    ///
    /// Unlike [`AppConfig::load`], a missing file is an error.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides, then validate it.
    ///
    /// When `path` is `None` the default location is used.
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Supports the following variables:
    /// - `PGSIEVE_DEBUG`: debug logging (true/false)
    /// - `PGSIEVE_WORKERS`: worker count
    /// - `PGSIEVE_DB_HOST`, `PGSIEVE_DB_PORT`, `PGSIEVE_DB_NAME`, `PGSIEVE_DB_USER`,
    ///   `PGSIEVE_DB_PASSWORD`: connection settings
    /// - `PGSIEVE_BASE_DIR`: base working directory
    ///
    /// Values that fail to parse are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PGSIEVE_DEBUG").and_then(|v| v.parse::<bool>().ok()) {
            self.general.debug = value;
            tracing::debug!(value, "Override general.debug from env");
        }

        if let Some(value) = lookup("PGSIEVE_WORKERS").and_then(|v| v.parse::<u32>().ok()) {
            self.scanning.workers = value;
            tracing::debug!(value, "Override scanning.workers from env");
        }

        if let Some(host) = lookup("PGSIEVE_DB_HOST") {
            self.database.host = host;
        }

        if let Some(port) = lookup("PGSIEVE_DB_PORT").and_then(|v| v.parse().ok()) {
            self.database.port = port;
        }

        if let Some(name) = lookup("PGSIEVE_DB_NAME") {
            self.database.name = name;
        }

        if let Some(user) = lookup("PGSIEVE_DB_USER") {
            self.database.user = user;
        }

        if let Some(password) = lookup("PGSIEVE_DB_PASSWORD") {
            self.database.password = Some(password);
        }

        if let Some(base_dir) = lookup("PGSIEVE_BASE_DIR") {
            self.paths.base_dir = PathBuf::from(base_dir);
        }
    }

    /// Check value constraints that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scanning.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanning.workers".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.scanning.pool_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "scanning.pool_size".to_string(),
                reason: "must be at least 1 when set".to_string(),
            });
        }

        if self.scanning.sample_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanning.sample_limit".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/pgsieve/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("org", "pgsieve", "pgsieve").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log per-column match decisions
    pub debug: bool,
}

/// Connection settings for the scanned database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database name
    pub name: String,
    /// Login role
    pub user: String,
    /// Password (read from `PGSIEVE_DB_PASSWORD`, never written to disk)
    #[serde(skip)]
    pub password: Option<String>,
    /// Connection and pool-acquire timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            name: "postgres".to_string(),
            user: "postgres".to_string(),
            password: None,
            connect_timeout_secs: 10,
        }
    }
}

impl DatabaseConfig {
    /// Connect timeout as a `Duration`.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Scanning behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Number of execution units, and the in-flight window inside each unit
    pub workers: u32,
    /// Connections per unit pool; defaults to `workers`
    pub pool_size: Option<u32>,
    /// Maximum distinct values sampled per column
    pub sample_limit: u32,
    /// Bound on a unit's scheduling loop; unset means no bound
    pub unit_timeout_secs: Option<u64>,
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            pool_size: None,
            sample_limit: 10_000,
            unit_timeout_secs: None,
        }
    }
}

impl ScanningConfig {
    /// Connections each unit opens.
    #[must_use]
    pub fn effective_pool_size(&self) -> u32 {
        self.pool_size.unwrap_or(self.workers)
    }

    /// Unit timeout as a `Duration`, if configured.
    #[must_use]
    pub fn unit_timeout(&self) -> Option<Duration> {
        self.unit_timeout_secs.map(Duration::from_secs)
    }
}

/// Rule and output document locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Base working directory
    pub base_dir: PathBuf,
    /// Rule document, relative to `<base_dir>/dict` unless absolute
    pub rules_file: PathBuf,
    /// Output dictionary, relative to `<base_dir>/dict` unless absolute
    pub output_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            rules_file: PathBuf::from("rules.json"),
            output_file: PathBuf::from("output_dict.json"),
        }
    }
}

impl PathsConfig {
    /// Directory holding rule and output documents.
    #[must_use]
    pub fn dict_dir(&self) -> PathBuf {
        self.base_dir.join(DICT_DIR)
    }

    /// Resolved rule document path.
    #[must_use]
    pub fn rules_path(&self) -> PathBuf {
        self.resolve(&self.rules_file)
    }

    /// Resolved output dictionary path.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_file)
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.dict_dir().join(file)
        }
    }
}
