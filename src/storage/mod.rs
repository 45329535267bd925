//! Storage module for the local cache and configuration.

pub mod config;
pub mod local;
pub mod schema;

pub use config::{load_config, save_config, AppConfig, ConfigError, SyncSettings};
pub use local::{LocalStore, StorageError};
