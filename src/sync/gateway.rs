//! Local-first persistence with a best-effort remote mirror.
//!
//! Every persist writes the local store synchronously, then queues the cloud
//! payload for a background worker when an identity is linked. Worker results
//! come back as [`SyncOutcome`]s that the owner folds into its record.
//!
//! A freshly linked identity starts with remote writes paused: nothing is
//! pushed until the owner has read the remote document and resolved it
//! against local state.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use super::merge::prepare_for_cloud_sync;
use super::{LeaderboardEntry, RemoteIdentity, RemoteStore, SyncError};
use crate::progress::clock::Clock;
use crate::progress::types::ProgressRecord;
use crate::storage::{LocalStore, StorageError, SyncSettings};

/// Result of one background remote write.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    /// Revision of the record that was pushed
    pub revision: u64,
    /// Sync time on success, error text on failure
    pub result: Result<DateTime<Utc>, String>,
}

impl SyncOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

enum SyncCommand {
    Push {
        document: Value,
        entry: LeaderboardEntry,
        revision: u64,
    },
    Flush(oneshot::Sender<()>),
}

struct RemoteLink<R: RemoteStore> {
    identity: RemoteIdentity,
    store: Arc<R>,
    commands: mpsc::UnboundedSender<SyncCommand>,
    outcomes: mpsc::UnboundedReceiver<SyncOutcome>,
    worker: JoinHandle<()>,
    /// Set until the remote copy has been reconciled
    paused: bool,
}

/// Persistence / sync gateway.
pub struct SyncGateway<R: RemoteStore> {
    local: LocalStore,
    settings: SyncSettings,
    clock: Arc<dyn Clock>,
    link: Option<RemoteLink<R>>,
    subscription: Option<broadcast::Receiver<Value>>,
}

impl<R: RemoteStore> SyncGateway<R> {
    /// Create an unlinked gateway over a local store.
    pub fn new(local: LocalStore, settings: SyncSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            local,
            settings,
            clock,
            link: None,
            subscription: None,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Linked identity, if any.
    pub fn identity(&self) -> Option<&RemoteIdentity> {
        self.link.as_ref().map(|l| &l.identity)
    }

    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }

    /// Whether remote writes are held back pending reconciliation.
    pub fn pushes_paused(&self) -> bool {
        self.link.as_ref().is_some_and(|l| l.paused)
    }

    /// Start mirroring persists to the remote store.
    pub fn resume_pushes(&mut self) {
        if let Some(link) = &mut self.link {
            if link.paused {
                tracing::info!(uid = %link.identity.uid, "Remote writes resumed");
            }
            link.paused = false;
        }
    }

    /// Load the locally cached record, or an empty one.
    pub fn load_local(&self) -> ProgressRecord {
        match self.local.load_record() {
            Ok(Some(record)) => {
                tracing::info!(xp = record.xp, revision = record.revision, "Hydrated local progress");
                record
            }
            Ok(None) => {
                tracing::info!("No local progress found, starting fresh");
                ProgressRecord::default()
            }
            Err(e) => {
                tracing::error!("Failed to read local progress: {}", e);
                ProgressRecord::default()
            }
        }
    }

    /// Write the record locally without touching the remote store.
    pub fn save_local_only(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        self.local.save_record(record).map_err(|e| {
            tracing::error!("Failed to save local progress: {}", e);
            e
        })
    }

    /// Persist a record: local first, then queue a remote write when linked
    /// and not paused.
    ///
    /// The returned result is the local write's. Remote results arrive later
    /// through [`SyncGateway::drain_outcomes`].
    pub fn persist(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let local_result = self.save_local_only(record);

        if let Some(link) = self.link.as_ref().filter(|l| !l.paused) {
            let now = self.clock.now();
            match prepare_for_cloud_sync(record, self.settings.cloud_photo_limit, now) {
                Ok(document) => {
                    let command = SyncCommand::Push {
                        document,
                        entry: leaderboard_entry(record, &link.identity, now),
                        revision: record.revision,
                    };
                    if link.commands.send(command).is_err() {
                        tracing::warn!("Remote sync worker has stopped; write not queued");
                    }
                }
                Err(e) => tracing::warn!("Failed to prepare cloud payload: {}", e),
            }
        }

        local_result
    }

    /// Finished remote writes since the last call, oldest first.
    pub fn drain_outcomes(&mut self) -> Vec<SyncOutcome> {
        let mut drained = Vec::new();
        if let Some(link) = &mut self.link {
            while let Ok(outcome) = link.outcomes.try_recv() {
                drained.push(outcome);
            }
        }
        drained
    }

    /// Wait until every queued remote write has been attempted.
    pub async fn flush(&self) {
        let Some(link) = &self.link else {
            return;
        };

        let (done_tx, done_rx) = oneshot::channel();
        if link.commands.send(SyncCommand::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Link a remote identity, start the write worker and subscribe to
    /// remote changes. Remote writes stay paused until
    /// [`SyncGateway::resume_pushes`]. Requires a tokio runtime.
    pub fn link(&mut self, identity: RemoteIdentity, store: Arc<R>) -> Result<(), SyncError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| SyncError::NetworkError(format!("no async runtime: {}", e)))?;

        if let Some(previous) = self.link.take() {
            tracing::info!(uid = %previous.identity.uid, "Replacing linked identity");
        }

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();

        let worker = handle.spawn(run_worker(
            Arc::clone(&store),
            identity.uid.clone(),
            commands_rx,
            outcomes_tx,
            Arc::clone(&self.clock),
        ));

        self.subscription = Some(store.subscribe(&identity.uid));
        tracing::info!(uid = %identity.uid, "Linked remote identity");

        self.link = Some(RemoteLink {
            identity,
            store,
            commands: commands_tx,
            outcomes: outcomes_rx,
            worker,
            paused: true,
        });

        Ok(())
    }

    /// Unlink the identity after letting queued writes finish.
    pub async fn unlink(&mut self) -> Vec<SyncOutcome> {
        self.subscription = None;
        let Some(link) = self.link.take() else {
            return Vec::new();
        };

        let RemoteLink {
            identity,
            commands,
            mut outcomes,
            worker,
            ..
        } = link;

        drop(commands);
        if let Err(e) = worker.await {
            tracing::warn!("Remote sync worker ended abnormally: {}", e);
        }

        let mut drained = Vec::new();
        while let Ok(outcome) = outcomes.try_recv() {
            drained.push(outcome);
        }

        tracing::info!(uid = %identity.uid, "Unlinked remote identity");
        drained
    }

    /// Read the remote document, giving up after the hydrate timeout.
    pub async fn fetch_remote(&self) -> Result<Option<Value>, SyncError> {
        let link = self.link.as_ref().ok_or(SyncError::NotLinked)?;
        let timeout = self.settings.hydrate_timeout();

        match tokio::time::timeout(timeout, link.store.fetch_user(&link.identity.uid)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(?timeout, "Remote read timed out");
                Err(SyncError::Timeout)
            }
        }
    }

    /// Read the remote document without a deadline.
    pub async fn fetch_remote_unbounded(&self) -> Result<Option<Value>, SyncError> {
        let link = self.link.as_ref().ok_or(SyncError::NotLinked)?;
        link.store.fetch_user(&link.identity.uid).await
    }

    /// Upload a file to `{folder}/{uid}/{millis}` and return its URL.
    pub async fn upload_file(
        &self,
        folder: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, SyncError> {
        let link = self.link.as_ref().ok_or(SyncError::NotLinked)?;
        let path = format!(
            "{}/{}/{}",
            folder,
            link.identity.uid,
            self.clock.now().timestamp_millis()
        );
        link.store.upload_file(&path, bytes, content_type).await
    }

    /// Top leaderboard entries.
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, SyncError> {
        let link = self.link.as_ref().ok_or(SyncError::NotLinked)?;
        link.store.top_leaderboard(limit).await
    }

    /// Remote documents pushed since the last call, oldest first.
    pub fn take_remote_changes(&mut self) -> Vec<Value> {
        let mut changes = Vec::new();
        let Some(rx) = &mut self.subscription else {
            return changes;
        };

        loop {
            match rx.try_recv() {
                Ok(document) => changes.push(document),
                Err(broadcast::error::TryRecvError::Empty) => break,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Remote change stream lagged");
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    self.subscription = None;
                    break;
                }
            }
        }

        changes
    }
}

/// Public ranking entry for a record.
fn leaderboard_entry(
    record: &ProgressRecord,
    identity: &RemoteIdentity,
    now: DateTime<Utc>,
) -> LeaderboardEntry {
    let username = record
        .profile
        .as_ref()
        .and_then(|p| p.name.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| identity.username());

    LeaderboardEntry {
        username,
        xp: record.xp,
        level: record.level(),
        last_active: now,
    }
}

async fn run_worker<R: RemoteStore>(
    store: Arc<R>,
    uid: String,
    mut commands: mpsc::UnboundedReceiver<SyncCommand>,
    outcomes: mpsc::UnboundedSender<SyncOutcome>,
    clock: Arc<dyn Clock>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            SyncCommand::Push {
                document,
                entry,
                revision,
            } => {
                let written: Result<(), SyncError> = async {
                    store.merge_user(&uid, document).await?;
                    store.upsert_leaderboard(&uid, &entry).await
                }
                .await;

                let result = match written {
                    Ok(()) => {
                        tracing::debug!(revision, "Remote sync succeeded");
                        Ok(clock.now())
                    }
                    Err(e) => {
                        tracing::warn!(revision, "Remote sync failed: {}", e);
                        Err(e.to_string())
                    }
                };

                let _ = outcomes.send(SyncOutcome { revision, result });
            }
            SyncCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}
