//! Progress record type definitions.
//!
//! The `ProgressRecord` is the single canonical aggregate per user. It is
//! persisted as camelCase JSON so documents written by older clients (and
//! documents missing newer fields) hydrate with defaults.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::units::WeightUnit;
use crate::coaching::fatigue::{is_deload_complete, DELOAD_DURATION_DAYS};

/// XP required per level.
pub const XP_PER_LEVEL: u64 = 500;

/// Most recent log entries kept per exercise.
pub const EXERCISE_LOG_LIMIT: usize = 10;

/// Most recent food entries kept.
pub const FOOD_LOG_LIMIT: usize = 50;

/// Most recent body weight entries kept.
pub const WEIGHT_LOG_LIMIT: usize = 30;

/// Default daily protein target in grams.
pub const DEFAULT_PROTEIN_GOAL: u32 = 150;

/// Persisted schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Level for an XP total.
pub fn level_for_xp(xp: u64) -> u64 {
    xp / XP_PER_LEVEL + 1
}

/// Post-session self-report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Easy,
    Perfect,
    Brutal,
}

impl Mood {
    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Mood::Easy => "Easy",
            Mood::Perfect => "Perfect",
            Mood::Brutal => "Brutal",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One logged set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetEntry {
    /// Load in pounds, `None` when the input was blank or not a number
    pub weight: Option<f64>,
    /// Repetitions (or seconds for timed holds)
    pub reps: Option<u32>,
    /// Whether the set was ticked off
    pub completed: bool,
}

impl SetEntry {
    /// Create a set from already-validated values.
    pub fn new(weight: f64, reps: u32, completed: bool) -> Self {
        Self {
            weight: sanitize_weight(weight),
            reps: Some(reps),
            completed,
        }
    }

    /// Create a set from raw form input, coercing malformed numbers to `None`.
    pub fn from_raw(weight: &str, reps: &str, completed: bool) -> Self {
        Self {
            weight: parse_weight(weight),
            reps: reps.trim().parse::<u32>().ok(),
            completed,
        }
    }

    /// Load in pounds, zero when missing.
    pub fn weight_or_zero(&self) -> f64 {
        self.weight.unwrap_or(0.0)
    }

    /// Repetitions, zero when missing.
    pub fn reps_or_zero(&self) -> u32 {
        self.reps.unwrap_or(0)
    }
}

/// Parse a free-text weight, returning `None` for anything that is not a
/// finite, non-negative number.
pub fn parse_weight(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().and_then(sanitize_weight)
}

fn sanitize_weight(weight: f64) -> Option<f64> {
    (weight.is_finite() && weight >= 0.0).then_some(weight)
}

/// Sets logged for a single exercise during a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSets {
    /// Exercise name (the key used in `bests` and `logs`)
    pub exercise: String,
    /// Sets in the order they were performed
    pub sets: Vec<SetEntry>,
}

impl ExerciseSets {
    pub fn new(exercise: impl Into<String>, sets: Vec<SetEntry>) -> Self {
        Self {
            exercise: exercise.into(),
            sets,
        }
    }

    /// Heaviest load across all sets (zero when none).
    pub fn max_weight(&self) -> f64 {
        max_set_weight(&self.sets)
    }

    pub fn completed_sets(&self) -> u32 {
        self.sets.iter().filter(|s| s.completed).count() as u32
    }

    pub fn total_reps(&self) -> u32 {
        self.sets.iter().map(SetEntry::reps_or_zero).sum()
    }

    /// Sum of load times reps.
    pub fn total_volume(&self) -> f64 {
        self.sets
            .iter()
            .map(|s| s.weight_or_zero() * s.reps_or_zero() as f64)
            .sum()
    }
}

/// Heaviest load in a list of sets.
pub fn max_set_weight(sets: &[SetEntry]) -> f64 {
    sets.iter().map(SetEntry::weight_or_zero).fold(0.0, f64::max)
}

/// Structured data captured while running a workout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub exercises: Vec<ExerciseSets>,
}

impl SessionData {
    pub fn new(exercises: Vec<ExerciseSets>) -> Self {
        Self { exercises }
    }

    pub fn completed_sets(&self) -> u32 {
        self.exercises.iter().map(ExerciseSets::completed_sets).sum()
    }

    pub fn total_reps(&self) -> u32 {
        self.exercises.iter().map(ExerciseSets::total_reps).sum()
    }

    pub fn total_volume(&self) -> f64 {
        self.exercises.iter().map(ExerciseSets::total_volume).sum()
    }
}

/// A personal record set during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrRecord {
    pub exercise: String,
    pub value: f64,
    pub previous_best: f64,
    pub unit: WeightUnit,
    pub timestamp: DateTime<Utc>,
}

/// Append-only history entry for a completed workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    pub workout_id: String,
    /// Minutes
    pub duration: u32,
    pub timestamp: DateTime<Utc>,
    pub xp_earned: u64,
    #[serde(default)]
    pub mood: Option<Mood>,
    #[serde(default)]
    pub prs: Vec<PrRecord>,
    #[serde(default, rename = "hadPRBonus")]
    pub had_pr_bonus: bool,
    #[serde(default)]
    pub total_reps: u32,
    #[serde(default)]
    pub total_volume: f64,
    /// Planned duration of the workout in minutes, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_duration: Option<u32>,
}

/// One entry in an exercise's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseLogEntry {
    pub date: DateTime<Utc>,
    /// Heaviest set, or the legacy single value
    pub weight: f64,
    #[serde(default)]
    pub unit: WeightUnit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<Vec<SetEntry>>,
}

/// A planned exercise inside a user-authored workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedExercise {
    pub name: String,
    #[serde(default)]
    pub sets: u32,
    #[serde(default)]
    pub reps: u32,
}

/// User-authored workout before it has been assigned an id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutDefinition {
    pub name: String,
    pub description: Option<String>,
    pub exercises: Vec<PlannedExercise>,
    /// Planned duration in minutes
    pub duration: Option<u32>,
}

/// Saved user-authored workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomWorkout {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub exercises: Vec<PlannedExercise>,
    #[serde(default)]
    pub duration: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// Category of a food entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodKind {
    #[default]
    Powerfood,
    Meal,
    #[serde(other)]
    Other,
}

/// Food entry as submitted by the user or the meal scanner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoodEntry {
    pub title: String,
    pub kind: FoodKind,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    /// Produced by the AI photo logger
    pub is_ai: bool,
}

impl FoodEntry {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_protein(mut self, grams: f64) -> Self {
        self.protein = Some(grams);
        self
    }

    /// Protein from free text such as "32g".
    pub fn with_protein_text(mut self, text: &str) -> Self {
        self.protein = parse_protein(text);
        self
    }

    pub fn with_calories(mut self, calories: f64) -> Self {
        self.calories = Some(calories);
        self
    }

    pub fn with_kind(mut self, kind: FoodKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn from_ai(mut self) -> Self {
        self.is_ai = true;
        self
    }
}

/// Extract a protein amount from text, ignoring units and stray characters.
pub fn parse_protein(text: &str) -> Option<f64> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Persisted food log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodLogEntry {
    pub id: Uuid,
    pub item: String,
    #[serde(rename = "type", default)]
    pub kind: FoodKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default, rename = "isAI")]
    pub is_ai: bool,
}

/// Body weight entry (one per local calendar day).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightLogEntry {
    pub date: NaiveDate,
    pub value: f64,
}

/// Angle of a progress photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoSide {
    #[default]
    Front,
    Side,
    Back,
}

/// Progress photo reference. Only the URL (or a data URL for guests) is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoLogEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub side: PhotoSide,
    pub url: String,
}

/// Kind of pending notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Milestone,
    Recovery,
    Upgrade,
    Pr,
}

/// Transient notice shown to the user until cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prs: Vec<PrRecord>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            prs: Vec::new(),
        }
    }
}

/// User profile. Absence routes the user to onboarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Profile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: u32,
    /// Current body weight in `unit`
    pub weight: Option<f64>,
    pub unit: WeightUnit,
    pub daily_protein_goal: u32,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub lifestyle: Option<String>,
    pub fitness_goal: Option<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: None,
            email: None,
            age: 30,
            weight: None,
            unit: WeightUnit::Lbs,
            daily_protein_goal: DEFAULT_PROTEIN_GOAL,
            photo_url: None,
            lifestyle: None,
            fitness_goal: None,
        }
    }
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
    pub weight: Option<f64>,
    pub unit: Option<WeightUnit>,
    pub daily_protein_goal: Option<u32>,
    pub photo_url: Option<String>,
    pub lifestyle: Option<String>,
    pub fitness_goal: Option<String>,
}

impl ProfileUpdate {
    /// Merge this update into a profile.
    pub fn apply_to(self, profile: &mut Profile) {
        if let Some(name) = self.name {
            profile.name = Some(name);
        }
        if let Some(email) = self.email {
            profile.email = Some(email);
        }
        if let Some(age) = self.age {
            profile.age = age;
        }
        if let Some(weight) = self.weight.and_then(sanitize_weight) {
            profile.weight = Some(weight);
        }
        if let Some(unit) = self.unit {
            profile.unit = unit;
        }
        if let Some(goal) = self.daily_protein_goal {
            profile.daily_protein_goal = goal;
        }
        if let Some(url) = self.photo_url {
            profile.photo_url = Some(url);
        }
        if let Some(lifestyle) = self.lifestyle {
            profile.lifestyle = Some(lifestyle);
        }
        if let Some(goal) = self.fitness_goal {
            profile.fitness_goal = Some(goal);
        }
    }
}

/// App settings stored with the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Blur progress photos
    pub is_privacy_mode: bool,
    pub sound_enabled: bool,
    pub haptics_enabled: bool,
    pub unit: WeightUnit,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            is_privacy_mode: true,
            sound_enabled: true,
            haptics_enabled: true,
            unit: WeightUnit::Lbs,
        }
    }
}

/// Tool usage tracked for achievement purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    CoachQuestion,
    FormCheck,
    StatsView,
    TipRead,
    RecoveryRoutine,
}

/// Counters for `ActivityKind` events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivityCounters {
    pub coach_questions: u32,
    pub form_checks: u32,
    pub stats_views: u32,
    pub tips_read: u32,
    pub recovery_routines: u32,
}

impl ActivityCounters {
    pub fn count(&self, kind: ActivityKind) -> u32 {
        match kind {
            ActivityKind::CoachQuestion => self.coach_questions,
            ActivityKind::FormCheck => self.form_checks,
            ActivityKind::StatsView => self.stats_views,
            ActivityKind::TipRead => self.tips_read,
            ActivityKind::RecoveryRoutine => self.recovery_routines,
        }
    }

    pub fn increment(&mut self, kind: ActivityKind) {
        let counter = match kind {
            ActivityKind::CoachQuestion => &mut self.coach_questions,
            ActivityKind::FormCheck => &mut self.form_checks,
            ActivityKind::StatsView => &mut self.stats_views,
            ActivityKind::TipRead => &mut self.tips_read,
            ActivityKind::RecoveryRoutine => &mut self.recovery_routines,
        };
        *counter = counter.saturating_add(1);
    }
}

/// Canonical per-user progress aggregate.
///
/// `level` is not stored; it is derived from `xp` by [`ProgressRecord::level`].
/// `revision` increases on every committed mutation and orders remote pushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressRecord {
    pub xp: u64,
    /// Newest first
    pub history: Vec<WorkoutSession>,
    /// Per exercise, newest first, at most `EXERCISE_LOG_LIMIT`
    pub logs: BTreeMap<String, Vec<ExerciseLogEntry>>,
    /// Heaviest recorded load per exercise
    pub bests: BTreeMap<String, f64>,
    pub custom_workouts: Vec<CustomWorkout>,
    /// Unlock order
    pub unlocked_badges: Vec<String>,
    pub badge_unlocks: BTreeMap<String, DateTime<Utc>>,
    pub food_logs: Vec<FoodLogEntry>,
    pub weight_logs: Vec<WeightLogEntry>,
    pub photo_logs: Vec<PhotoLogEntry>,
    pub profile: Option<Profile>,
    pub settings: Settings,
    pub activity: ActivityCounters,
    pub pending_notifications: Vec<Notification>,
    pub is_deload_week: bool,
    pub deload_start_date: Option<DateTime<Utc>>,
    pub last_difficulty_jump: Option<DateTime<Utc>>,
    pub last_sync_success: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub revision: u64,
    pub sync_version: u32,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            xp: 0,
            history: Vec::new(),
            logs: BTreeMap::new(),
            bests: BTreeMap::new(),
            custom_workouts: Vec::new(),
            unlocked_badges: Vec::new(),
            badge_unlocks: BTreeMap::new(),
            food_logs: Vec::new(),
            weight_logs: Vec::new(),
            photo_logs: Vec::new(),
            profile: None,
            settings: Settings::default(),
            activity: ActivityCounters::default(),
            pending_notifications: Vec::new(),
            is_deload_week: false,
            deload_start_date: None,
            last_difficulty_jump: None,
            last_sync_success: false,
            last_sync_time: None,
            revision: 0,
            sync_version: SCHEMA_VERSION,
        }
    }
}

impl ProgressRecord {
    /// Level derived from XP.
    pub fn level(&self) -> u64 {
        level_for_xp(self.xp)
    }

    /// Coarse progress score used to compare two copies of a record.
    pub fn progress_score(&self) -> u64 {
        self.xp
            .saturating_add(100u64.saturating_mul(self.history.len() as u64))
    }

    /// Most recent session.
    pub fn latest_session(&self) -> Option<&WorkoutSession> {
        self.history.first()
    }

    /// Whether a de-load is running at `now`. A flagged de-load ends once
    /// seven days have elapsed since it started.
    pub fn in_deload(&self, now: DateTime<Utc>) -> bool {
        self.is_deload_week
            && !is_deload_complete(self.deload_start_date, now, DELOAD_DURATION_DAYS)
    }

    /// Clear a de-load whose period has run out. Returns whether it changed.
    pub fn expire_deload(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_deload_week || self.in_deload(now) {
            return false;
        }
        self.is_deload_week = false;
        self.deload_start_date = None;
        true
    }

    pub fn has_badge(&self, badge_id: &str) -> bool {
        self.unlocked_badges.iter().any(|id| id == badge_id)
    }

    /// Daily protein goal, defaulting when there is no profile.
    pub fn protein_goal(&self) -> u32 {
        self.profile
            .as_ref()
            .map(|p| p.daily_protein_goal)
            .unwrap_or(DEFAULT_PROTEIN_GOAL)
    }

    /// Serialize to the persisted JSON document.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Hydrate from a persisted JSON document, defaulting every missing or
    /// malformed top-level field.
    pub fn hydrate(value: Value) -> Self {
        let Value::Object(incoming) = value else {
            return Self::default();
        };

        let mut record = match serde_json::from_value::<Self>(Value::Object(incoming.clone())) {
            Ok(record) => record,
            Err(_) => {
                let mut accepted = serde_json::Map::new();
                for (key, field) in incoming {
                    let mut candidate = accepted.clone();
                    candidate.insert(key.clone(), field.clone());
                    if serde_json::from_value::<Self>(Value::Object(candidate)).is_ok() {
                        accepted.insert(key, field);
                    } else {
                        tracing::warn!(field = %key, "Dropping malformed field during hydration");
                    }
                }
                serde_json::from_value(Value::Object(accepted)).unwrap_or_default()
            }
        };

        record.normalize();
        record
    }

    /// Hydrate from a JSON string.
    pub fn hydrate_str(json: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Self::hydrate(value))
    }

    /// Restore invariants that older or hand-edited documents may violate.
    fn normalize(&mut self) {
        if self.deload_start_date.is_none() {
            self.is_deload_week = false;
        }

        let mut seen = std::collections::HashSet::new();
        self.unlocked_badges.retain(|id| seen.insert(id.clone()));

        for entries in self.logs.values_mut() {
            entries.truncate(EXERCISE_LOG_LIMIT);
        }
    }
}
