//! Consecutive-day streak calculation.

use chrono::{Duration, FixedOffset, NaiveDate};
use std::collections::BTreeSet;

use super::types::WorkoutSession;

/// Distinct local calendar dates with at least one session, newest first.
pub fn session_dates(history: &[WorkoutSession], offset: FixedOffset) -> Vec<NaiveDate> {
    let dates: BTreeSet<NaiveDate> = history
        .iter()
        .map(|s| s.timestamp.with_timezone(&offset).date_naive())
        .collect();
    dates.into_iter().rev().collect()
}

/// Count consecutive training days ending at the most recent session.
///
/// The chain must be anchored to `today` or the day before; otherwise the
/// streak is already broken and the result is zero.
pub fn calculate_streak(history: &[WorkoutSession], today: NaiveDate, offset: FixedOffset) -> u32 {
    let dates = session_dates(history, offset);
    let Some(&latest) = dates.first() else {
        return 0;
    };

    let yesterday = today - Duration::days(1);
    if latest != today && latest != yesterday {
        return 0;
    }

    let mut streak = 1;
    for pair in dates.windows(2) {
        if (pair[0] - pair[1]).num_days() == 1 {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}
