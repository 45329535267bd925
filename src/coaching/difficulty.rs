//! Adaptive difficulty (progressive overload from mood tags).

use std::collections::BTreeMap;

use crate::progress::types::{Mood, WorkoutSession};

/// Multiplier applied to every target on an adaptive boost.
pub const BOOST_FACTOR: f64 = 1.05;

/// Consecutive easy sessions that trigger a boost.
const BOOST_WINDOW: usize = 2;

/// Consecutive easy sessions that trigger a manual weight suggestion.
const SUGGESTION_THRESHOLD: usize = 3;

/// Sessions inspected for a weight suggestion.
const SUGGESTION_WINDOW: usize = 5;

/// Raised targets produced by an adaptive boost.
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyBoost {
    /// Every best raised by 5% and rounded
    pub targets: BTreeMap<String, f64>,
    pub message: String,
}

/// Boost all targets when the two most recent sessions were both easy.
pub fn calculate_adaptive_difficulty(
    history: &[WorkoutSession],
    bests: &BTreeMap<String, f64>,
) -> Option<DifficultyBoost> {
    let too_easy = history.len() >= BOOST_WINDOW
        && history[..BOOST_WINDOW]
            .iter()
            .all(|s| s.mood == Some(Mood::Easy));

    if !too_easy {
        return None;
    }

    let targets = bests
        .iter()
        .map(|(exercise, weight)| (exercise.clone(), (weight * BOOST_FACTOR).round()))
        .collect();

    Some(DifficultyBoost {
        targets,
        message: "You made the last 2 sessions look easy. I've increased your weight targets by 5% to keep the gains coming.".to_string(),
    })
}

/// Suggest adding load after a run of easy sessions.
pub fn check_weight_suggestion(history: &[WorkoutSession]) -> Option<String> {
    let easy_streak = history
        .iter()
        .take(SUGGESTION_WINDOW)
        .take_while(|s| s.mood == Some(Mood::Easy))
        .count();

    (easy_streak >= SUGGESTION_THRESHOLD).then(|| {
        format!(
            "You've reported {} easy sessions in a row. Consider adding 5-10% more weight to your lifts.",
            easy_streak
        )
    })
}
