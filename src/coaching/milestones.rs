//! Strength milestones for the foundational movements.
//!
//! Each exercise has three ranks (Rookie, Savage, Spartan). A new personal best
//! that crosses a rank threshold raises a milestone notification.

/// A rank threshold for one exercise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MilestoneLevel {
    pub rank: &'static str,
    pub value: f64,
    pub reward: &'static str,
}

/// Milestone ladder for one exercise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrengthMilestone {
    pub exercise: &'static str,
    /// Display unit ("lbs", "Reps" or "Sec")
    pub unit: &'static str,
    pub levels: [MilestoneLevel; 3],
}

const fn level(rank: &'static str, value: f64, reward: &'static str) -> MilestoneLevel {
    MilestoneLevel { rank, value, reward }
}

/// Milestone table.
pub const STRENGTH_MILESTONES: &[StrengthMilestone] = &[
    StrengthMilestone {
        exercise: "Pushups",
        unit: "Reps",
        levels: [
            level("Rookie", 10.0, "Chest Plate Badge"),
            level("Savage", 30.0, "Iron Pectoral Badge"),
            level("Spartan", 50.0, "Titanium Chest Badge"),
        ],
    },
    StrengthMilestone {
        exercise: "Goblet Squat",
        unit: "lbs",
        levels: [
            level("Rookie", 25.0, "Foundation Badge"),
            level("Savage", 50.0, "Pillar of Strength"),
            level("Spartan", 85.0, "Legionnaire Badge"),
        ],
    },
    StrengthMilestone {
        exercise: "Plank Hold",
        unit: "Sec",
        levels: [
            level("Rookie", 60.0, "Steady Core Badge"),
            level("Savage", 120.0, "Unshakable Badge"),
            level("Spartan", 180.0, "Iron Core Badge"),
        ],
    },
    StrengthMilestone {
        exercise: "Dumbbell Row",
        unit: "lbs",
        levels: [
            level("Rookie", 25.0, "Back Builder Badge"),
            level("Savage", 50.0, "Lat Dominator Badge"),
            level("Spartan", 75.0, "Pull Power Badge"),
        ],
    },
    StrengthMilestone {
        exercise: "Lunges",
        unit: "lbs",
        levels: [
            level("Rookie", 0.0, "First Step Badge"),
            level("Savage", 30.0, "Stride Master Badge"),
            level("Spartan", 50.0, "Legionnaire Badge"),
        ],
    },
    StrengthMilestone {
        exercise: "Shoulder Press",
        unit: "lbs",
        levels: [
            level("Rookie", 20.0, "Shoulder Starter Badge"),
            level("Savage", 40.0, "Boulder Shoulder Badge"),
            level("Spartan", 65.0, "Atlas Badge"),
        ],
    },
];

/// Look up the milestone ladder for an exercise.
pub fn find_milestone(exercise: &str) -> Option<&'static StrengthMilestone> {
    STRENGTH_MILESTONES.iter().find(|m| m.exercise == exercise)
}

/// A milestone crossed by a new personal best.
#[derive(Debug, Clone, PartialEq)]
pub struct MilestoneHit {
    pub exercise: String,
    pub rank: &'static str,
    pub value: f64,
    pub reward: &'static str,
    pub unit: &'static str,
}

impl MilestoneHit {
    /// Notification title, e.g. "SAVAGE ACHIEVED".
    pub fn title(&self) -> String {
        format!("{} ACHIEVED", self.rank.to_uppercase())
    }

    /// Notification body.
    pub fn message(&self) -> String {
        format!(
            "You hit {} {} on {}! {} unlocked.",
            self.value, self.unit, self.exercise, self.reward
        )
    }
}

/// First rank whose threshold lies in `(old_best, new_best]`.
pub fn check_milestone_achieved(exercise: &str, old_best: f64, new_best: f64) -> Option<MilestoneHit> {
    let milestone = find_milestone(exercise)?;
    milestone
        .levels
        .iter()
        .find(|l| new_best >= l.value && old_best < l.value)
        .map(|l| MilestoneHit {
            exercise: exercise.to_string(),
            rank: l.rank,
            value: l.value,
            reward: l.reward,
            unit: milestone.unit,
        })
}

/// Where a personal best sits on an exercise's ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseRank {
    pub current: Option<MilestoneLevel>,
    pub next: Option<MilestoneLevel>,
    /// Percent toward `next`, 100 when the ladder is complete
    pub progress: f64,
    pub best: f64,
    pub unit: &'static str,
}

/// Current and next rank for a personal best.
pub fn exercise_rank(exercise: &str, best: f64) -> Option<ExerciseRank> {
    let milestone = find_milestone(exercise)?;
    let best = if best.is_finite() { best.max(0.0) } else { 0.0 };

    let mut current = None;
    let mut next = Some(milestone.levels[0]);
    for (i, lvl) in milestone.levels.iter().enumerate() {
        if best >= lvl.value {
            current = Some(*lvl);
            next = milestone.levels.get(i + 1).copied();
        }
    }

    let progress = match next {
        Some(n) if n.value > 0.0 => (best / n.value * 100.0).min(100.0),
        Some(_) => 100.0,
        None => 100.0,
    };

    Some(ExerciseRank {
        current,
        next,
        progress,
        best,
        unit: milestone.unit,
    })
}
