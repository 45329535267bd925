//! Local durable cache using rusqlite.
//!
//! The progress record is stored as one JSON document under a single key.
//! Writes are synchronous; a failed write leaves the in-memory record intact.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::path::Path;
use thiserror::Error;

use crate::progress::types::ProgressRecord;
use crate::storage::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};

/// Key holding the serialized progress record.
pub const PROGRESS_KEY: &str = "strive_progress";

/// SQLite-backed key/value store.
pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    /// Open or create a store at the given path.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let store = Self { conn };
        store.initialize()?;

        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let store = Self { conn };
        store.initialize()?;

        Ok(store)
    }

    fn initialize(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

        let current_version = self.get_schema_version()?;

        if current_version < CURRENT_VERSION {
            self.migrate(current_version)?;
        }

        Ok(())
    }

    fn get_schema_version(&self) -> Result<i32, StorageError> {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(version) => Ok(version),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(StorageError::QueryFailed(e.to_string())),
        }
    }

    fn migrate(&self, from_version: i32) -> Result<(), StorageError> {
        if from_version < 1 {
            self.conn
                .execute_batch(SCHEMA)
                .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

            self.conn
                .execute(
                    "INSERT INTO schema_version (version, applied_at) VALUES (?, datetime('now'))",
                    [CURRENT_VERSION],
                )
                .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

            tracing::info!("Local store migrated to version {}", CURRENT_VERSION);
        }

        Ok(())
    }

    /// Write a raw value.
    pub fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn
            .execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    /// Read a raw value.
    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StorageError::QueryFailed(e.to_string()))
    }

    /// Delete a value.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    /// Persist the progress record.
    pub fn save_record(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let json = serde_json::to_string(record)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        self.put(PROGRESS_KEY, &json)
    }

    /// Load the progress record, if one has been saved.
    ///
    /// Missing or malformed fields are defaulted; a document that is not JSON
    /// at all is an error.
    pub fn load_record(&self) -> Result<Option<ProgressRecord>, StorageError> {
        match self.get(PROGRESS_KEY)? {
            Some(json) => ProgressRecord::hydrate_str(&json)
                .map(Some)
                .map_err(|e| StorageError::DeserializationError(e.to_string())),
            None => Ok(None),
        }
    }

    /// Remove the saved progress record.
    pub fn clear_record(&self) -> Result<(), StorageError> {
        self.remove(PROGRESS_KEY)
    }
}

/// Local storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to open local store: {0}")]
    ConnectionFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}
