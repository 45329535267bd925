//! Integration tests for identity linking, merge and multi-device sync.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use strive::progress::engine::{LinkOutcome, MergeOutcome, ProgressEngine, WorkoutCompletion};
use strive::progress::types::{FoodEntry, ProgressRecord, WorkoutSession};
use strive::progress::ManualClock;
use strive::storage::{LocalStore, SyncSettings};
use strive::sync::RemoteIdentity;
use strive::InMemoryRemoteStore;

type Engine = ProgressEngine<InMemoryRemoteStore>;

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 2, 7, 15, 0).unwrap()))
}

fn engine_with(record: Option<&ProgressRecord>, clock: Arc<ManualClock>) -> Engine {
    let local = LocalStore::open_in_memory().unwrap();
    if let Some(record) = record {
        local.save_record(record).unwrap();
    }
    Engine::with_clock(local, SyncSettings::default(), clock)
}

fn record(xp: u64, sessions: usize) -> ProgressRecord {
    let history = (0..sessions)
        .map(|i| WorkoutSession {
            workout_id: format!("w{}", i),
            duration: 30,
            timestamp: Utc.with_ymd_and_hms(2024, 8, 20 + i as u32, 18, 0, 0).unwrap(),
            xp_earned: 0,
            mood: None,
            prs: Vec::new(),
            had_pr_bonus: false,
            total_reps: 0,
            total_volume: 0.0,
            target_duration: None,
        })
        .collect();
    ProgressRecord {
        xp,
        history,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_confirmed_upload_makes_remote_match_local() {
    let store = Arc::new(InMemoryRemoteStore::new());
    store.push_external("u1", record(100, 1).to_value().unwrap());

    let mut engine = engine_with(Some(&record(500, 3)), clock());
    let outcome = engine
        .link_identity(RemoteIdentity::new("u1"), Arc::clone(&store))
        .await
        .unwrap();

    let LinkOutcome::LocalAhead { comparison, cloud } = outcome else {
        panic!("expected local to be ahead, got {:?}", outcome);
    };
    assert_eq!(comparison.local_score, 800);
    assert_eq!(comparison.cloud_score, 200);

    assert_eq!(engine.smart_merge(*cloud, true), MergeOutcome::Uploaded);
    engine.flush().await;

    let mut remote = ProgressRecord::hydrate(store.document("u1").unwrap());
    remote.last_sync_success = engine.record().last_sync_success;
    remote.last_sync_time = engine.record().last_sync_time;
    assert_eq!(&remote, engine.record());
    assert_eq!(remote.xp, 500);
    assert_eq!(remote.history.len(), 3);
    assert!(engine.record().last_sync_success);
}

fn cloud_document(xp: u64, sessions: usize, revision: u64) -> serde_json::Value {
    let mut document = record(xp, sessions).to_value().unwrap();
    document["revision"] = serde_json::json!(revision);
    document
}

#[tokio::test]
async fn test_pending_merge_holds_remote_writes() {
    let store = Arc::new(InMemoryRemoteStore::new());
    store.push_external("u1", cloud_document(100, 0, 20));

    let mut engine = engine_with(Some(&record(900, 3)), clock());
    let LinkOutcome::LocalAhead { cloud, .. } = engine
        .link_identity(RemoteIdentity::new("u1"), Arc::clone(&store))
        .await
        .unwrap()
    else {
        panic!("expected local to be ahead");
    };

    engine.log_food(FoodEntry::new("Oats"));
    engine.flush().await;

    let remote = store.document("u1").unwrap();
    assert_eq!(remote["xp"], 100);
    assert_eq!(remote["revision"], 20);
    assert_eq!(store.user_writes(), 1);
    assert_eq!(engine.record().food_logs.len(), 1);

    assert_eq!(engine.smart_merge(*cloud, true), MergeOutcome::Uploaded);
    engine.flush().await;

    let remote = ProgressRecord::hydrate(store.document("u1").unwrap());
    assert_eq!(remote.xp, 900);
    assert_eq!(remote.food_logs.len(), 1);
    assert!(remote.revision > 20);
    assert_eq!(remote.revision, engine.record().revision);
}

#[tokio::test]
async fn test_unreachable_remote_is_read_before_any_write() {
    let store = Arc::new(InMemoryRemoteStore::new());
    store.push_external("u1", cloud_document(100, 0, 20));
    store.set_offline(true);

    let mut engine = engine_with(Some(&record(900, 3)), clock());
    let outcome = engine
        .link_identity(RemoteIdentity::new("u1"), Arc::clone(&store))
        .await
        .unwrap();
    assert_eq!(outcome, LinkOutcome::RemoteUnavailable);

    store.set_offline(false);
    engine.complete_workout(WorkoutCompletion::new("w9", 30));
    engine.flush().await;
    assert_eq!(store.document("u1").unwrap()["xp"], 100);
    assert_eq!(store.user_writes(), 1);

    let retried = engine.retry_link().await.unwrap();
    assert!(matches!(retried, LinkOutcome::LocalAhead { .. }));
    engine.flush().await;
    assert_eq!(store.document("u1").unwrap()["xp"], 100);
}

#[tokio::test]
async fn test_declined_upload_takes_cloud() {
    let store = Arc::new(InMemoryRemoteStore::new());
    store.push_external("u1", record(100, 1).to_value().unwrap());

    let mut engine = engine_with(Some(&record(500, 3)), clock());
    let LinkOutcome::LocalAhead { cloud, .. } = engine
        .link_identity(RemoteIdentity::new("u1"), Arc::clone(&store))
        .await
        .unwrap()
    else {
        panic!("expected local to be ahead");
    };

    assert_eq!(engine.smart_merge(*cloud, false), MergeOutcome::Downloaded);
    assert_eq!(engine.record().xp, 100);
    assert_eq!(engine.record().history.len(), 1);
}

#[tokio::test]
async fn test_cloud_ahead_hydrates_on_link() {
    let store = Arc::new(InMemoryRemoteStore::new());
    store.push_external("u1", record(2000, 4).to_value().unwrap());

    let mut engine = engine_with(Some(&record(100, 1)), clock());
    let outcome = engine
        .link_identity(RemoteIdentity::new("u1"), store)
        .await
        .unwrap();

    assert_eq!(outcome, LinkOutcome::Hydrated);
    assert_eq!(engine.record().xp, 2000);
}

#[tokio::test]
async fn test_second_device_receives_pushes() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let shared_clock = clock();

    let mut phone = engine_with(None, shared_clock.clone());
    assert_eq!(
        phone
            .link_identity(RemoteIdentity::new("u1").with_display_name("Casey"), Arc::clone(&store))
            .await
            .unwrap(),
        LinkOutcome::Created
    );
    phone.complete_workout(WorkoutCompletion::new("push_day", 40));
    phone.flush().await;

    let mut tablet = engine_with(None, shared_clock.clone());
    assert_eq!(
        tablet
            .link_identity(RemoteIdentity::new("u1").with_display_name("Casey"), Arc::clone(&store))
            .await
            .unwrap(),
        LinkOutcome::Hydrated
    );
    assert_eq!(tablet.record().xp, phone.record().xp);

    shared_clock.advance(Duration::hours(20));
    phone.complete_workout(WorkoutCompletion::new("pull_day", 40));
    phone.flush().await;

    assert_eq!(tablet.apply_remote_changes(), 1);
    assert_eq!(tablet.record().xp, phone.record().xp);
    assert_eq!(tablet.record().history.len(), 2);
    assert_eq!(tablet.record().revision, phone.record().revision);

    assert_eq!(phone.apply_remote_changes(), 0);
}

#[tokio::test]
async fn test_stale_push_does_not_clobber_local() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let mut engine = engine_with(None, clock());
    engine
        .link_identity(RemoteIdentity::new("u1"), Arc::clone(&store))
        .await
        .unwrap();

    engine.log_food(FoodEntry::new("Greek Yogurt").with_protein(18.0));
    engine.log_food(FoodEntry::new("Tuna").with_protein(25.0));
    engine.flush().await;
    let revision = engine.record().revision;

    store.push_external("u1", serde_json::json!({ "revision": revision - 1, "foodLogs": [] }));

    assert_eq!(engine.apply_remote_changes(), 0);
    assert_eq!(engine.record().food_logs.len(), 2);
    assert_eq!(engine.record().revision, revision);
}

#[tokio::test]
async fn test_failed_remote_write_keeps_local_and_flags_sync() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let mut engine = engine_with(None, clock());
    engine
        .link_identity(RemoteIdentity::new("u1"), Arc::clone(&store))
        .await
        .unwrap();
    engine.flush().await;
    assert!(engine.record().last_sync_success);

    store.set_offline(true);
    engine.complete_workout(WorkoutCompletion::new("w1", 30));
    engine.flush().await;

    assert_eq!(engine.record().history.len(), 1);
    assert!(!engine.record().last_sync_success);
    assert!(engine.gateway().load_local().history.len() == 1);

    store.set_offline(false);
    assert!(engine.force_resync().await.unwrap());
    assert!(engine.record().history.is_empty());
    assert!(engine.record().last_sync_success);
}

#[tokio::test]
async fn test_force_resync_without_remote_document() {
    let store = Arc::new(InMemoryRemoteStore::new());
    store.set_offline(true);

    let mut engine = engine_with(Some(&record(300, 2)), clock());
    assert_eq!(
        engine
            .link_identity(RemoteIdentity::new("u1"), Arc::clone(&store))
            .await
            .unwrap(),
        LinkOutcome::RemoteUnavailable
    );

    store.set_offline(false);
    assert!(!engine.force_resync().await.unwrap());
    assert_eq!(engine.record().xp, 300);
    assert!(store.document("u1").is_none());

    assert_eq!(engine.retry_link().await.unwrap(), LinkOutcome::Created);
    engine.flush().await;
    assert_eq!(store.document("u1").unwrap()["xp"], 300);
}

#[tokio::test]
async fn test_leaderboard_ranks_linked_users() {
    let store = Arc::new(InMemoryRemoteStore::new());

    let mut alex = engine_with(Some(&record(1200, 0)), clock());
    alex.link_identity(RemoteIdentity::new("a").with_display_name("Alex"), Arc::clone(&store))
        .await
        .unwrap();
    alex.flush().await;

    let mut blair = engine_with(Some(&record(400, 0)), clock());
    blair
        .link_identity(RemoteIdentity::new("b").with_display_name("Blair"), Arc::clone(&store))
        .await
        .unwrap();
    blair.flush().await;

    let top = blair.leaderboard(10).await.unwrap();
    let names: Vec<&str> = top.iter().map(|e| e.username.as_str()).collect();
    assert_eq!(names, vec!["Alex", "Blair"]);
    assert_eq!(top[0].level, 3);

    blair.unlink_identity().await;
    assert!(blair.leaderboard(10).await.is_err());
}
