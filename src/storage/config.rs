//! Application configuration.
//!
//! Stored as TOML in the platform data directory. A missing file yields
//! defaults; the remote section is optional so the app runs fully offline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::progress::units::WeightUnit;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Local cache settings
    pub storage: StorageSettings,
    /// Remote sync settings
    pub sync: SyncSettings,
    /// Display settings
    pub display: DisplaySettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            storage: StorageSettings::default(),
            sync: SyncSettings::default(),
            display: DisplaySettings::default(),
        }
    }
}

impl AppConfig {
    /// Full path of the local database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage.database_file)
    }
}

/// Local cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite file name inside the data directory
    pub database_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_file: "strive.db".to_string(),
        }
    }
}

/// Remote sync settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Base URL of the remote document store; `None` keeps the app offline
    pub remote_url: Option<String>,
    /// Bearer token for the remote store
    pub api_token: Option<String>,
    /// Maximum wait for the initial remote read
    pub hydrate_timeout_secs: u64,
    /// Interval between remote change polls
    pub poll_interval_secs: u64,
    /// Photo entries sent with the cloud payload
    pub cloud_photo_limit: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            remote_url: None,
            api_token: None,
            hydrate_timeout_secs: 3,
            poll_interval_secs: 30,
            cloud_photo_limit: 5,
        }
    }
}

impl SyncSettings {
    pub fn hydrate_timeout(&self) -> Duration {
        Duration::from_secs(self.hydrate_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Display settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Preferred weight unit for new profiles
    pub unit: WeightUnit,
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "strive", "Strive")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&get_config_path(), get_data_dir())
}

/// Load configuration from a specific file, using `data_dir` for data files.
pub fn load_config_from(path: &Path, data_dir: PathBuf) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig {
            data_dir,
            ..Default::default()
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.data_dir = data_dir;

    Ok(config)
}

/// Save application configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path())
}

/// Save configuration to a specific file.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content = toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
