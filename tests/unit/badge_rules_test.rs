//! Unit tests for badge unlocking through the engine.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use strive::progress::engine::{ProgressEngine, WorkoutCompletion};
use strive::progress::types::{ActivityKind, ExerciseSets, FoodEntry, Mood, SessionData, SetEntry};
use strive::progress::ManualClock;
use strive::social::badges::{find_badge, BADGES};
use strive::storage::{LocalStore, SyncSettings};
use strive::InMemoryRemoteStore;

type Engine = ProgressEngine<InMemoryRemoteStore>;

fn create_engine() -> (Engine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()));
    let engine = Engine::with_clock(
        LocalStore::open_in_memory().unwrap(),
        SyncSettings::default(),
        clock.clone(),
    );
    (engine, clock)
}

#[test]
fn test_catalog_ids_are_unique() {
    let mut ids: Vec<&str> = BADGES.iter().map(|b| b.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), BADGES.len());
    assert_eq!(BADGES.len(), 35);
}

#[test]
fn test_streak_badge_survives_broken_streak() {
    let (mut engine, clock) = create_engine();
    for i in 0..3 {
        engine.complete_workout(WorkoutCompletion::new(format!("w{}", i), 30));
        clock.advance(Duration::days(1));
    }
    assert!(engine.record().has_badge("streak_3"));
    assert_eq!(engine.streak(), 3);

    clock.advance(Duration::days(5));
    assert_eq!(engine.streak(), 0);
    engine.complete_workout(WorkoutCompletion::new("w_after_break", 30));

    assert_eq!(engine.streak(), 1);
    assert!(engine.record().has_badge("streak_3"));
}

#[test]
fn test_unlocked_badges_only_grow() {
    let (mut engine, clock) = create_engine();
    let mut previous: Vec<String> = Vec::new();

    for i in 0..12 {
        let session = SessionData::new(vec![ExerciseSets::new(
            "Deadlift",
            vec![SetEntry::new(135.0 + i as f64 * 10.0, 10, true); 3],
        )]);
        let mood = if i % 2 == 0 { Mood::Brutal } else { Mood::Perfect };
        engine.complete_workout(
            WorkoutCompletion::new(format!("w{}", i), 30)
                .with_session(session)
                .with_mood(mood),
        );
        clock.advance(Duration::hours(20));

        let current = engine.record().unlocked_badges.clone();
        assert!(current.starts_with(&previous));
        for id in &current {
            assert!(engine.record().badge_unlocks.contains_key(id));
        }
        previous = current;
    }

    for id in ["first_blood", "iron_discipline", "iron_grip", "unbreakable"] {
        assert!(engine.record().has_badge(id), "missing {}", id);
    }
}

#[test]
fn test_late_session_badge() {
    let (mut engine, clock) = create_engine();
    clock.set(Utc.with_ymd_and_hms(2024, 3, 4, 22, 45, 0).unwrap());
    engine.complete_workout(WorkoutCompletion::new("late", 30));

    assert!(engine.record().has_badge("night_owl"));
    assert!(!engine.record().has_badge("early_bird"));
}

#[test]
fn test_beat_target_time_badge() {
    let (mut engine, _) = create_engine();
    engine.complete_workout(WorkoutCompletion::new("w1", 29).with_target_duration(30));
    assert!(!engine.record().has_badge("speed_demon"));

    engine.complete_workout(WorkoutCompletion::new("w2", 28).with_target_duration(30));
    assert!(engine.record().has_badge("speed_demon"));
}

#[test]
fn test_protein_streak_badge() {
    let (mut engine, clock) = create_engine();
    for _ in 0..3 {
        engine.log_food(FoodEntry::new("Chicken").with_protein(160.0));
        clock.advance(Duration::days(1));
    }
    clock.advance(Duration::hours(-12));
    engine.complete_workout(WorkoutCompletion::new("w1", 30));

    assert!(engine.record().has_badge("protein_streak_3"));
    assert!(!engine.record().has_badge("protein_streak_7"));
}

#[test]
fn test_activity_badge_unlocks_on_next_workout() {
    let (mut engine, _) = create_engine();
    for _ in 0..3 {
        engine.record_activity(ActivityKind::FormCheck);
    }
    assert!(!engine.record().has_badge("form_expert"));

    engine.complete_workout(WorkoutCompletion::new("w1", 30));
    assert!(engine.record().has_badge("form_expert"));
}

#[test]
fn test_hydration_badge_never_unlocks() {
    let badge = find_badge("hydration_hero").unwrap();
    assert!(!badge.is_implemented());

    let (mut engine, clock) = create_engine();
    for i in 0..10 {
        engine.complete_workout(WorkoutCompletion::new(format!("w{}", i), 30));
        clock.advance(Duration::days(1));
    }
    assert!(!engine.record().has_badge("hydration_hero"));
}
