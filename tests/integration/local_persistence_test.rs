//! Integration tests for the on-disk cache and configuration.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use strive::progress::engine::{MergeOutcome, ProgressEngine, WorkoutCompletion};
use strive::progress::units::WeightUnit;
use strive::progress::ManualClock;
use strive::storage::config::{load_config_from, save_config_to};
use strive::storage::local::PROGRESS_KEY;
use strive::storage::{AppConfig, LocalStore, SyncSettings};
use strive::{InMemoryRemoteStore, ProgressRecord};
use tempfile::tempdir;

type Engine = ProgressEngine<InMemoryRemoteStore>;

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 3, 18, 30, 0).unwrap()))
}

#[test]
fn test_progress_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("data").join("strive.db");

    let saved = {
        let mut engine = Engine::with_clock(
            LocalStore::open(&db_path).unwrap(),
            SyncSettings::default(),
            clock(),
        );
        engine.complete_workout(WorkoutCompletion::new("w1", 35));
        engine.log_weight(182.5);
        engine.record().clone()
    };

    let engine = Engine::with_clock(
        LocalStore::open(&db_path).unwrap(),
        SyncSettings::default(),
        clock(),
    );
    assert_eq!(engine.record(), &saved);
    assert_eq!(engine.record().history.len(), 1);
}

#[test]
fn test_corrupt_cache_starts_fresh() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("strive.db");

    let store = LocalStore::open(&db_path).unwrap();
    store.put(PROGRESS_KEY, "{not json").unwrap();
    assert!(store.load_record().is_err());

    let engine = Engine::with_clock(store, SyncSettings::default(), clock());
    assert_eq!(engine.record().xp, 0);
    assert!(engine.record().history.is_empty());
}

#[test]
fn test_missing_config_uses_defaults() {
    let dir = tempdir().unwrap();
    let config = load_config_from(&dir.path().join("config.toml"), dir.path().to_path_buf()).unwrap();

    assert_eq!(config.sync, SyncSettings::default());
    assert_eq!(config.display.unit, WeightUnit::Lbs);
    assert_eq!(config.database_path(), dir.path().join("strive.db"));
}

#[test]
fn test_config_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = AppConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    config.sync.remote_url = Some("https://sync.example.test".to_string());
    config.sync.poll_interval_secs = 10;
    config.display.unit = WeightUnit::Kg;

    save_config_to(&config, &path).unwrap();
    let loaded = load_config_from(&path, dir.path().to_path_buf()).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_config_fills_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[sync]\nhydrate_timeout_secs = 5\n").unwrap();

    let config = load_config_from(&path, dir.path().to_path_buf()).unwrap();
    assert_eq!(config.sync.hydrate_timeout_secs, 5);
    assert_eq!(config.sync.poll_interval_secs, 30);
    assert_eq!(config.storage.database_file, "strive.db");
}

#[test]
fn test_open_applies_configured_unit_to_new_user() {
    let dir = tempdir().unwrap();
    let mut config = AppConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    config.display.unit = WeightUnit::Kg;

    let engine = Engine::open(&config).unwrap();
    assert_eq!(engine.display_unit(), WeightUnit::Kg);
    assert!(dir.path().join("strive.db").exists());
}

#[test]
fn test_failed_local_write_on_adopt_is_flagged() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("strive.db");

    let mut engine = Engine::with_clock(
        LocalStore::open(&db_path).unwrap(),
        SyncSettings::default(),
        clock(),
    );

    let other = rusqlite::Connection::open(&db_path).unwrap();
    other.execute_batch("DROP TABLE kv_store;").unwrap();

    let cloud = ProgressRecord {
        xp: 250,
        ..Default::default()
    };
    assert_eq!(engine.smart_merge(cloud, false), MergeOutcome::Downloaded);
    assert_eq!(engine.record().xp, 250);
    assert!(!engine.record().last_sync_success);
}
