//! Cloud payload preparation and coarse record comparison.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::progress::types::ProgressRecord;

/// Device-local fields that are never sent to the remote store.
const LOCAL_ONLY_FIELDS: &[&str] = &["lastSyncSuccess", "lastSyncTime"];

/// Build the document written to the remote store.
///
/// Photo entries are capped to the most recent `photo_limit`; the derived
/// level is included for readers that do not compute it.
pub fn prepare_for_cloud_sync(
    record: &ProgressRecord,
    photo_limit: usize,
    now: DateTime<Utc>,
) -> Result<Value, serde_json::Error> {
    let mut document = record.to_value()?;

    if let Value::Object(fields) = &mut document {
        if let Some(Value::Array(photos)) = fields.get_mut("photoLogs") {
            photos.truncate(photo_limit);
        }
        for key in LOCAL_ONLY_FIELDS {
            fields.remove(*key);
        }
        fields.insert("level".to_string(), Value::from(record.level()));
        fields.insert("lastSync".to_string(), Value::from(now.to_rfc3339()));
    }

    Ok(document)
}

/// Result of comparing two copies of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeComparison {
    pub local_score: u64,
    pub cloud_score: u64,
}

impl MergeComparison {
    pub fn local_is_ahead(&self) -> bool {
        self.local_score > self.cloud_score
    }

    pub fn cloud_is_ahead(&self) -> bool {
        self.cloud_score > self.local_score
    }

    pub fn are_equal(&self) -> bool {
        self.local_score == self.cloud_score
    }

    /// Confirmation prompt for uploading local progress.
    pub fn prompt(&self) -> String {
        format!(
            "Your local progress ({} points) is higher than your cloud save ({} points). Sync local to cloud?",
            self.local_score, self.cloud_score
        )
    }
}

/// Score both copies as `xp + 100 * sessions`.
pub fn compare_data_sets(local: &ProgressRecord, cloud: &ProgressRecord) -> MergeComparison {
    MergeComparison {
        local_score: local.progress_score(),
        cloud_score: cloud.progress_score(),
    }
}
