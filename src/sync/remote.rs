//! Remote document store implementations.
//!
//! `InMemoryRemoteStore` backs tests and offline demos; `HttpRemoteStore`
//! talks to a JSON document service over HTTPS.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;

use super::{LeaderboardEntry, RemoteStore, SyncError};
use crate::storage::SyncSettings;

/// Buffered remote change notifications per subscriber.
const CHANGE_CHANNEL_CAPACITY: usize = 32;

/// Merge `incoming` top-level fields into `existing`.
fn merge_document(existing: Option<Value>, incoming: Value) -> Value {
    match (existing, incoming) {
        (Some(Value::Object(mut current)), Value::Object(fields)) => {
            for (key, value) in fields {
                current.insert(key, value);
            }
            Value::Object(current)
        }
        (_, incoming) => incoming,
    }
}

/// Remote store held in process memory.
#[derive(Debug)]
pub struct InMemoryRemoteStore {
    users: RwLock<HashMap<String, Value>>,
    leaderboard: RwLock<HashMap<String, LeaderboardEntry>>,
    files: RwLock<HashMap<String, Vec<u8>>>,
    channels: RwLock<HashMap<String, broadcast::Sender<Value>>>,
    offline: AtomicBool,
    latency_ms: AtomicU64,
    user_writes: AtomicUsize,
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            leaderboard: RwLock::new(HashMap::new()),
            files: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            user_writes: AtomicUsize::new(0),
        }
    }

    /// Make every call fail with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay applied to every call.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Stored user document.
    pub fn document(&self, uid: &str) -> Option<Value> {
        self.users
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(uid)
            .cloned()
    }

    /// Stored leaderboard entry.
    pub fn leaderboard_entry(&self, uid: &str) -> Option<LeaderboardEntry> {
        self.leaderboard
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(uid)
            .cloned()
    }

    /// Number of successful user document writes.
    pub fn user_writes(&self) -> usize {
        self.user_writes.load(Ordering::SeqCst)
    }

    /// Write a document as another device would.
    pub fn push_external(&self, uid: &str, document: Value) {
        self.apply_user_write(uid, document);
    }

    fn apply_user_write(&self, uid: &str, document: Value) {
        let merged = {
            let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
            let merged = merge_document(users.remove(uid), document);
            users.insert(uid.to_string(), merged.clone());
            merged
        };
        self.user_writes.fetch_add(1, Ordering::SeqCst);

        if let Some(tx) = self
            .channels
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(uid)
        {
            let _ = tx.send(merged);
        }
    }

    async fn simulate_network(&self) -> Result<(), SyncError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::NetworkError("remote unreachable".to_string()));
        }
        Ok(())
    }
}

impl RemoteStore for InMemoryRemoteStore {
    async fn fetch_user(&self, uid: &str) -> Result<Option<Value>, SyncError> {
        self.simulate_network().await?;
        Ok(self.document(uid))
    }

    async fn merge_user(&self, uid: &str, document: Value) -> Result<(), SyncError> {
        self.simulate_network().await?;
        self.apply_user_write(uid, document);
        Ok(())
    }

    async fn upsert_leaderboard(&self, uid: &str, entry: &LeaderboardEntry) -> Result<(), SyncError> {
        self.simulate_network().await?;
        self.leaderboard
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(uid.to_string(), entry.clone());
        Ok(())
    }

    async fn top_leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, SyncError> {
        self.simulate_network().await?;
        let mut entries: Vec<LeaderboardEntry> = self
            .leaderboard
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.xp.cmp(&a.xp).then_with(|| a.username.cmp(&b.username)));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn upload_file(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, SyncError> {
        self.simulate_network().await?;
        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), bytes);
        Ok(format!("memory://{}", path))
    }

    fn subscribe(&self, uid: &str) -> broadcast::Receiver<Value> {
        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(uid.to_string())
            .or_insert_with(|| broadcast::channel(CHANGE_CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

/// Upload response body.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// Shared HTTP plumbing, cloneable into the polling task.
#[derive(Debug, Clone)]
struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpClient {
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, SyncError> {
        self.authorized(request).send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                SyncError::NetworkError(e.to_string())
            } else {
                SyncError::ApiError(e.to_string())
            }
        })
    }

    fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else if status.is_server_error() {
            Err(SyncError::NetworkError(format!("remote returned status {}", status)))
        } else {
            Err(SyncError::ApiError(format!("remote returned status {}", status)))
        }
    }

    async fn fetch_user(&self, uid: &str) -> Result<Option<Value>, SyncError> {
        let response = self
            .send(self.http.get(self.url(&format!("users/{}", uid))))
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::check_status(response)?;
        let document = response
            .json::<Value>()
            .await
            .map_err(|e| SyncError::SerializationError(e.to_string()))?;
        Ok(Some(document))
    }
}

/// Remote store reached over HTTPS.
///
/// Routes, relative to the base URL: `users/{uid}` (GET, PATCH),
/// `leaderboard/{uid}` (PUT), `leaderboard?limit=N` (GET) and
/// `files/{path}` (PUT, returns `{"url": ...}`).
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: HttpClient,
    poll_interval: Duration,
}

impl HttpRemoteStore {
    /// Create a store for a base URL.
    pub fn new(base_url: impl Into<String>, api_token: Option<String>) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SyncError::NetworkError(e.to_string()))?;

        Ok(Self {
            client: HttpClient {
                http,
                base_url: base_url.into(),
                api_token,
            },
            poll_interval: Duration::from_secs(30),
        })
    }

    /// Create a store from configuration, `None` when no remote is configured.
    pub fn from_settings(settings: &SyncSettings) -> Result<Option<Self>, SyncError> {
        match &settings.remote_url {
            Some(url) => Ok(Some(
                Self::new(url.clone(), settings.api_token.clone())?
                    .with_poll_interval(settings.poll_interval()),
            )),
            None => Ok(None),
        }
    }

    /// Interval between change polls for subscriptions.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl RemoteStore for HttpRemoteStore {
    async fn fetch_user(&self, uid: &str) -> Result<Option<Value>, SyncError> {
        self.client.fetch_user(uid).await
    }

    async fn merge_user(&self, uid: &str, document: Value) -> Result<(), SyncError> {
        let request = self
            .client
            .http
            .patch(self.client.url(&format!("users/{}", uid)))
            .json(&document);
        HttpClient::check_status(self.client.send(request).await?)?;
        Ok(())
    }

    async fn upsert_leaderboard(&self, uid: &str, entry: &LeaderboardEntry) -> Result<(), SyncError> {
        let request = self
            .client
            .http
            .put(self.client.url(&format!("leaderboard/{}", uid)))
            .json(entry);
        HttpClient::check_status(self.client.send(request).await?)?;
        Ok(())
    }

    async fn top_leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, SyncError> {
        let request = self
            .client
            .http
            .get(self.client.url("leaderboard"))
            .query(&[("limit", limit)]);
        let response = HttpClient::check_status(self.client.send(request).await?)?;
        response
            .json::<Vec<LeaderboardEntry>>()
            .await
            .map_err(|e| SyncError::SerializationError(e.to_string()))
    }

    async fn upload_file(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, SyncError> {
        let request = self
            .client
            .http
            .put(self.client.url(&format!("files/{}", path)))
            .header("Content-Type", content_type)
            .body(bytes);
        let response = HttpClient::check_status(self.client.send(request).await?)
            .map_err(|e| SyncError::UploadFailed(e.to_string()))?;
        let body = response
            .json::<UploadResponse>()
            .await
            .map_err(|e| SyncError::SerializationError(e.to_string()))?;
        Ok(body.url)
    }

    /// Poll the user document and forward changes.
    ///
    /// Polling runs on the current tokio runtime and stops once every
    /// receiver has been dropped. Outside a runtime no changes are delivered.
    fn subscribe(&self, uid: &str) -> broadcast::Receiver<Value> {
        let (tx, rx) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime; remote changes will not be polled");
            return rx;
        };

        let client = self.client.clone();
        let uid = uid.to_string();
        let interval = self.poll_interval;

        handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut last_seen: Option<Value> = None;

            loop {
                ticker.tick().await;
                if tx.receiver_count() == 0 {
                    break;
                }

                match client.fetch_user(&uid).await {
                    Ok(Some(document)) => {
                        if last_seen.as_ref() != Some(&document) {
                            last_seen = Some(document.clone());
                            let _ = tx.send(document);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::debug!("Remote poll failed: {}", e),
                }
            }
        });

        rx
    }
}
