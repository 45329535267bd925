//! Unit tests for the day-streak calculator.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use strive::progress::streak::calculate_streak;
use strive::progress::types::WorkoutSession;

fn session_at(timestamp: DateTime<Utc>) -> WorkoutSession {
    WorkoutSession {
        workout_id: "w".to_string(),
        duration: 30,
        timestamp,
        xp_earned: 0,
        mood: None,
        prs: Vec::new(),
        had_pr_bonus: false,
        total_reps: 0,
        total_volume: 0.0,
        target_duration: None,
    }
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn noon(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
}

#[test]
fn test_gap_breaks_the_chain() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
    let history = vec![
        session_at(noon(today)),
        session_at(noon(today - Duration::days(1))),
        session_at(noon(today - Duration::days(3))),
    ];

    assert_eq!(calculate_streak(&history, today, utc()), 2);
}

#[test]
fn test_streak_anchored_to_yesterday() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
    let history: Vec<WorkoutSession> = (1..=4)
        .map(|d| session_at(noon(today - Duration::days(d))))
        .collect();

    assert_eq!(calculate_streak(&history, today, utc()), 4);
}

#[test]
fn test_stale_history_has_no_streak() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
    let history = vec![session_at(noon(today - Duration::days(2)))];

    assert_eq!(calculate_streak(&history, today, utc()), 0);
    assert_eq!(calculate_streak(&[], today, utc()), 0);
}

#[test]
fn test_multiple_sessions_same_day_count_once() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
    let history = vec![
        session_at(noon(today)),
        session_at(noon(today) - Duration::hours(3)),
        session_at(noon(today - Duration::days(1))),
    ];

    assert_eq!(calculate_streak(&history, today, utc()), 2);
}

#[test]
fn test_local_offset_decides_the_day() {
    // 23:30 UTC on the 9th is already the 10th at UTC+2.
    let late = Utc.with_ymd_and_hms(2024, 6, 9, 23, 30, 0).unwrap();
    let history = vec![session_at(late)];
    let today = NaiveDate::from_ymd_opt(2024, 6, 11).unwrap();

    assert_eq!(calculate_streak(&history, today, utc()), 0);
    assert_eq!(
        calculate_streak(&history, today, FixedOffset::east_opt(2 * 3600).unwrap()),
        1
    );
}
