//! Persistence / sync gateway.
//!
//! Local storage is authoritative and written first. A remote document store,
//! when an identity is linked, receives best-effort merge writes from a
//! background worker plus a trimmed public leaderboard entry.

pub mod gateway;
pub mod merge;
pub mod remote;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::storage::StorageError;

pub use gateway::{SyncGateway, SyncOutcome};
pub use merge::{compare_data_sets, prepare_for_cloud_sync, MergeComparison};
pub use remote::{HttpRemoteStore, InMemoryRemoteStore};

/// Sync-related errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No remote identity linked")]
    NotLinked,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Remote read timed out")]
    Timeout,

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Local storage error: {0}")]
    Local(#[from] StorageError),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::SerializationError(e.to_string())
    }
}

/// Authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteIdentity {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl RemoteIdentity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            email: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Display name, else the local part of the email.
    pub fn preferred_name(&self) -> Option<String> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .filter(|local| !local.is_empty())
                    .map(str::to_string)
            })
    }

    /// Public name on the leaderboard.
    pub fn username(&self) -> String {
        self.preferred_name().unwrap_or_else(|| "Anonymous".to_string())
    }
}

/// Public ranking entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub xp: u64,
    pub level: u64,
    pub last_active: DateTime<Utc>,
}

/// Remote document store.
///
/// User documents are merge-written: top-level fields present in the write
/// replace the stored ones, absent fields are kept.
pub trait RemoteStore: Send + Sync + 'static {
    /// Read the user document, `None` when it does not exist
    fn fetch_user(
        &self,
        uid: &str,
    ) -> impl std::future::Future<Output = Result<Option<Value>, SyncError>> + Send;

    /// Merge-write the user document
    fn merge_user(
        &self,
        uid: &str,
        document: Value,
    ) -> impl std::future::Future<Output = Result<(), SyncError>> + Send;

    /// Write the user's public leaderboard entry
    fn upsert_leaderboard(
        &self,
        uid: &str,
        entry: &LeaderboardEntry,
    ) -> impl std::future::Future<Output = Result<(), SyncError>> + Send;

    /// Top entries by XP, highest first
    fn top_leaderboard(
        &self,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<LeaderboardEntry>, SyncError>> + Send;

    /// Store a binary file and return a retrievable URL
    fn upload_file(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl std::future::Future<Output = Result<String, SyncError>> + Send;

    /// Stream of user documents written by any client
    fn subscribe(&self, uid: &str) -> broadcast::Receiver<Value>;
}
