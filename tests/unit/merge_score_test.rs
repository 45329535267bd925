//! Unit tests for record scoring and cloud payload preparation.

use chrono::{NaiveDate, TimeZone, Utc};
use strive::progress::types::{PhotoLogEntry, PhotoSide, ProgressRecord, WorkoutSession};
use strive::sync::{compare_data_sets, prepare_for_cloud_sync};
use uuid::Uuid;

fn sessions(count: usize) -> Vec<WorkoutSession> {
    (0..count)
        .map(|i| WorkoutSession {
            workout_id: format!("w{}", i),
            duration: 30,
            timestamp: Utc.with_ymd_and_hms(2024, 2, 1 + i as u32, 9, 0, 0).unwrap(),
            xp_earned: 0,
            mood: None,
            prs: Vec::new(),
            had_pr_bonus: false,
            total_reps: 0,
            total_volume: 0.0,
            target_duration: None,
        })
        .collect()
}

fn record(xp: u64, history: usize) -> ProgressRecord {
    ProgressRecord {
        xp,
        history: sessions(history),
        ..Default::default()
    }
}

#[test]
fn test_local_ahead_scores() {
    let comparison = compare_data_sets(&record(500, 3), &record(100, 1));

    assert_eq!(comparison.local_score, 800);
    assert_eq!(comparison.cloud_score, 200);
    assert!(comparison.local_is_ahead());
    assert!(!comparison.cloud_is_ahead());
    assert!(comparison.prompt().contains("800 points"));
}

#[test]
fn test_equal_scores() {
    let comparison = compare_data_sets(&record(300, 0), &record(200, 1));
    assert!(comparison.are_equal());
    assert!(!comparison.local_is_ahead());
}

#[test]
fn test_cloud_payload_caps_photos_and_strips_local_fields() {
    let mut local = record(1000, 2);
    local.last_sync_success = true;
    local.last_sync_time = Some(Utc::now());
    local.photo_logs = (0..8)
        .map(|i| PhotoLogEntry {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 2, 1 + i).unwrap(),
            side: PhotoSide::Front,
            url: format!("https://cdn.test/{}.jpg", i),
        })
        .collect();

    let now = Utc.with_ymd_and_hms(2024, 2, 20, 8, 0, 0).unwrap();
    let payload = prepare_for_cloud_sync(&local, 5, now).unwrap();

    assert_eq!(payload["photoLogs"].as_array().unwrap().len(), 5);
    assert_eq!(payload["photoLogs"][0]["url"], "https://cdn.test/0.jpg");
    assert!(payload.get("lastSyncSuccess").is_none());
    assert!(payload.get("lastSyncTime").is_none());
    assert_eq!(payload["level"], 3);
    assert_eq!(payload["lastSync"], now.to_rfc3339());

    assert_eq!(local.photo_logs.len(), 8);
}
