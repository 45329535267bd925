//! Overtraining detection and de-load cycling.
//!
//! Three consecutive brutal sessions put the athlete into a seven day de-load
//! in which consumers halve every weight target.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progress::types::{Mood, WorkoutSession};

/// Length of a de-load period in days.
pub const DELOAD_DURATION_DAYS: i64 = 7;

/// Intensity multiplier applied to targets during a de-load.
pub const DELOAD_REDUCTION_FACTOR: f64 = 0.5;

/// Sessions inspected by the fatigue check.
const FATIGUE_WINDOW: usize = 3;

/// Result of inspecting recent session moods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FatigueStatus {
    /// No sign of accumulated fatigue
    Clear,
    /// Two of the last three sessions were brutal; informational only
    Warning,
    /// Three brutal sessions in a row; enter de-load
    Deload,
}

impl FatigueStatus {
    /// Get display label.
    pub fn label(&self) -> &'static str {
        match self {
            FatigueStatus::Clear => "Fresh",
            FatigueStatus::Warning => "Running Hot",
            FatigueStatus::Deload => "De-load Required",
        }
    }

    /// Coaching message for the status.
    pub fn message(&self) -> &'static str {
        match self {
            FatigueStatus::Clear => "",
            FatigueStatus::Warning => {
                "Your recent sessions have been intense. If the next one feels brutal too, consider taking it easier."
            }
            FatigueStatus::Deload => {
                "3 consecutive 'Redline' sessions detected. Central Nervous System fatigue is high. De-load initiated."
            }
        }
    }

    pub fn should_deload(&self) -> bool {
        matches!(self, FatigueStatus::Deload)
    }
}

impl std::fmt::Display for FatigueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Inspect the most recent sessions (history is newest first).
pub fn check_fatigue_status(history: &[WorkoutSession]) -> FatigueStatus {
    let window = &history[..history.len().min(FATIGUE_WINDOW)];
    let brutal = window
        .iter()
        .filter(|s| s.mood == Some(Mood::Brutal))
        .count();

    if window.len() == FATIGUE_WINDOW && brutal == FATIGUE_WINDOW {
        FatigueStatus::Deload
    } else if brutal == 2 {
        FatigueStatus::Warning
    } else {
        FatigueStatus::Clear
    }
}

/// Target load during a de-load.
pub fn deload_weight(normal_weight: f64, reduction_factor: f64) -> f64 {
    (normal_weight * reduction_factor).round()
}

/// Whether a de-load that started at `start` has run its course.
///
/// Elapsed time is counted in whole days, so the period ends once the
/// seventh full day has passed. A missing start date counts as complete.
pub fn is_deload_complete(start: Option<DateTime<Utc>>, now: DateTime<Utc>, duration_days: i64) -> bool {
    match start {
        Some(start) => (now - start).num_days() >= duration_days,
        None => true,
    }
}
