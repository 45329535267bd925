//! Unit tests for ProgressEngine invariants over workout sequences.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use strive::progress::engine::{ProgressEngine, WorkoutCompletion, PR_XP_MULTIPLIER, XP_PER_SET};
use strive::progress::types::{level_for_xp, ExerciseSets, Mood, SessionData, SetEntry};
use strive::progress::ManualClock;
use strive::storage::{LocalStore, SyncSettings};
use strive::InMemoryRemoteStore;

type Engine = ProgressEngine<InMemoryRemoteStore>;

fn create_engine() -> (Engine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 8, 17, 30, 0).unwrap()));
    let engine = Engine::with_clock(
        LocalStore::open_in_memory().unwrap(),
        SyncSettings::default(),
        clock.clone(),
    );
    (engine, clock)
}

/// Deterministic pseudo-random sequence.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

fn random_session(rng: &mut Lcg) -> SessionData {
    let exercises = ["Squat", "Bench Press", "Deadlift", "Shoulder Press"];
    let picked = 1 + rng.next(3) as usize;
    SessionData::new(
        exercises
            .iter()
            .take(picked)
            .map(|name| {
                let sets = (0..1 + rng.next(4))
                    .map(|_| SetEntry::new(50.0 + rng.next(250) as f64, 1 + rng.next(10) as u32, rng.next(4) != 0))
                    .collect();
                ExerciseSets::new(*name, sets)
            })
            .collect(),
    )
}

fn random_mood(rng: &mut Lcg) -> Option<Mood> {
    match rng.next(4) {
        0 => None,
        1 => Some(Mood::Easy),
        2 => Some(Mood::Perfect),
        _ => Some(Mood::Brutal),
    }
}

#[test]
fn test_xp_non_decreasing_and_level_derived() {
    let (mut engine, clock) = create_engine();
    let mut rng = Lcg(7);
    let mut previous_xp = 0;

    for i in 0..60 {
        let mut completion = WorkoutCompletion::new(format!("w{}", i), 10 + rng.next(50) as u32);
        if rng.next(2) == 0 {
            completion = completion.with_session(random_session(&mut rng));
        }
        if let Some(mood) = random_mood(&mut rng) {
            completion = completion.with_mood(mood);
        }

        engine.complete_workout(completion);
        clock.advance(Duration::hours(10));

        let record = engine.record();
        assert!(record.xp >= previous_xp);
        assert_eq!(record.level(), record.xp / 500 + 1);
        assert_eq!(record.level(), level_for_xp(record.xp));
        previous_xp = record.xp;
    }
}

#[test]
fn test_bests_non_decreasing_and_pr_iff_strictly_greater() {
    let (mut engine, clock) = create_engine();
    let mut rng = Lcg(42);

    for i in 0..60 {
        let session = random_session(&mut rng);
        let before = engine.record().bests.clone();
        let mood = random_mood(&mut rng);

        let mut completion = WorkoutCompletion::new(format!("w{}", i), 30).with_session(session.clone());
        if let Some(mood) = mood {
            completion = completion.with_mood(mood);
        }
        let prs = engine.complete_workout(completion);
        clock.advance(Duration::days(1));

        for (exercise, old) in &before {
            assert!(engine.record().bests[exercise] >= *old, "{} best decreased", exercise);
        }

        let mut expected: Vec<String> = Vec::new();
        let mut running = before.clone();
        for exercise in &session.exercises {
            let max = exercise.max_weight();
            let best = running.get(&exercise.exercise).copied().unwrap_or(0.0);
            if max > 0.0 && max > best {
                expected.push(exercise.exercise.clone());
                running.insert(exercise.exercise.clone(), max);
            }
        }
        let actual: Vec<String> = prs.iter().map(|pr| pr.exercise.clone()).collect();
        assert_eq!(actual, expected);

        for pr in &prs {
            assert_eq!(pr.previous_best, before.get(&pr.exercise).copied().unwrap_or(0.0));
        }
    }
}

#[test]
fn test_pr_bonus_matches_pr_list() {
    let (mut engine, clock) = create_engine();
    let mut rng = Lcg(1234);

    for i in 0..40 {
        let session = random_session(&mut rng);
        let total_sets = u64::from(session.completed_sets());
        engine.complete_workout(WorkoutCompletion::new(format!("w{}", i), 30).with_session(session));
        clock.advance(Duration::days(1));

        let latest = engine.record().latest_session().unwrap();
        assert_eq!(latest.had_pr_bonus, !latest.prs.is_empty());
        if latest.had_pr_bonus {
            assert_eq!(latest.xp_earned, PR_XP_MULTIPLIER * total_sets * XP_PER_SET);
        } else {
            assert_eq!(latest.xp_earned, total_sets * XP_PER_SET);
        }
    }
}

#[test]
fn test_zero_completed_sets_still_logged() {
    let (mut engine, _) = create_engine();
    let session = SessionData::new(vec![ExerciseSets::new(
        "Squat",
        vec![SetEntry::new(0.0, 5, false)],
    )]);

    let prs = engine.complete_workout(WorkoutCompletion::new("w1", 40).with_session(session));

    assert!(prs.is_empty());
    assert_eq!(engine.record().history.len(), 1);
    assert_eq!(engine.record().latest_session().unwrap().xp_earned, 0);
}

#[test]
fn test_deload_start_date_stable_until_day_seven() {
    let (mut engine, clock) = create_engine();
    for i in 0..3 {
        engine.complete_workout(WorkoutCompletion::new(format!("b{}", i), 30).with_mood(Mood::Brutal));
        clock.advance(Duration::hours(2));
    }
    let started = engine.record().deload_start_date.unwrap();

    for day in 1..7 {
        clock.set(started + Duration::days(day) + Duration::hours(1));
        engine.complete_workout(WorkoutCompletion::new(format!("d{}", day), 30).with_mood(Mood::Brutal));
        assert!(engine.record().is_deload_week, "cleared early on day {}", day);
        assert_eq!(engine.record().deload_start_date, Some(started));
    }

    clock.set(started + Duration::days(7));
    engine.complete_workout(WorkoutCompletion::new("p1", 30).with_mood(Mood::Perfect));
    assert!(!engine.record().is_deload_week);
    assert!(engine.record().deload_start_date.is_none());
}

#[test]
fn test_boost_suppressed_during_deload() {
    let (mut engine, clock) = create_engine();
    engine.complete_workout(
        WorkoutCompletion::new("seed", 30).with_session(SessionData::new(vec![ExerciseSets::new(
            "Squat",
            vec![SetEntry::new(200.0, 5, true)],
        )])),
    );
    for i in 0..3 {
        clock.advance(Duration::hours(3));
        engine.complete_workout(WorkoutCompletion::new(format!("b{}", i), 30).with_mood(Mood::Brutal));
    }
    assert!(engine.record().is_deload_week);

    for i in 0..2 {
        clock.advance(Duration::hours(3));
        engine.complete_workout(WorkoutCompletion::new(format!("e{}", i), 30).with_mood(Mood::Easy));
    }

    assert_eq!(engine.record().bests["Squat"], 200.0);
    assert!(engine.record().last_difficulty_jump.is_none());
}
