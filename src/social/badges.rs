//! Badge catalog and unlock evaluation.
//!
//! Badges are one-way: once an id is in `unlocked_badges` it is never
//! re-evaluated or removed. Predicates see the post-mutation record plus the
//! session that triggered the evaluation.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::coaching::milestones::exercise_rank;
use crate::progress::types::{
    ActivityKind, FoodKind, FoodLogEntry, Mood, ProgressRecord, SessionData, WorkoutSession,
};

/// Badge group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeGroup {
    /// Workout consistency
    Combat,
    /// Nutrition and protein
    Fuel,
    /// Milestones and PRs
    Strength,
    /// AI and tool usage
    Intel,
    /// Long-term dedication
    Legacy,
}

impl BadgeGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeGroup::Combat => "combat",
            BadgeGroup::Fuel => "fuel",
            BadgeGroup::Strength => "strength",
            BadgeGroup::Intel => "intel",
            BadgeGroup::Legacy => "legacy",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "combat" => Some(BadgeGroup::Combat),
            "fuel" => Some(BadgeGroup::Fuel),
            "strength" => Some(BadgeGroup::Strength),
            "intel" => Some(BadgeGroup::Intel),
            "legacy" => Some(BadgeGroup::Legacy),
            _ => None,
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            BadgeGroup::Combat => "Workout Consistency",
            BadgeGroup::Fuel => "Nutrition & Protein",
            BadgeGroup::Strength => "Milestones & PRs",
            BadgeGroup::Intel => "AI & Tool Usage",
            BadgeGroup::Legacy => "Long-term Dedication",
        }
    }
}

/// Unlock criteria.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BadgeRule {
    /// At least N sessions in history
    TotalWorkouts(usize),
    /// Triggering session has at least N reps
    SessionReps(u32),
    /// Triggering session moved at least N lbs
    SessionVolume(f64),
    /// Triggering session finished between 22:00 and 04:00 local
    LateSession,
    /// Triggering session finished between 04:00 and 07:00 local
    EarlySession,
    /// Distinct training days in the trailing seven days
    TrainingDaysInWeek(usize),
    /// Triggering session finished N minutes under its target duration
    BeatTargetBy(u32),
    /// Consecutive days meeting the protein goal
    ProteinStreak(u32),
    /// Distinct powerfood titles logged
    DistinctPowerfoods(usize),
    /// Consecutive Mondays with a weigh-in
    MondayWeighIns(usize),
    FoodLogs(usize),
    /// Food entries produced by the meal scanner
    AiFoodLogs(usize),
    ProgressPhotos(usize),
    AnyExerciseLog,
    ExerciseLogged(&'static str),
    /// PRs set across sessions in the trailing seven days
    PrsInWeek(usize),
    /// Top milestone rank on any exercise
    SpartanRank,
    /// Triggering session set a PR on the exercise
    SessionPr(&'static str),
    SessionMood(Mood),
    Activity(ActivityKind, u32),
    /// Sessions whose workout id equals the value
    WorkoutIdIs(&'static str, usize),
    /// Sessions whose workout id contains the value
    WorkoutIdContains(&'static str, usize),
    Level(u64),
    Streak(u32),
    /// No backing data is tracked; never unlocks
    Unimplemented,
}

/// Catalog entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Badge {
    pub id: &'static str,
    pub group: BadgeGroup,
    pub title: &'static str,
    pub description: &'static str,
    pub rule: BadgeRule,
}

impl Badge {
    /// Whether the badge can ever unlock.
    pub fn is_implemented(&self) -> bool {
        !matches!(self.rule, BadgeRule::Unimplemented)
    }
}

const fn badge(
    id: &'static str,
    group: BadgeGroup,
    title: &'static str,
    description: &'static str,
    rule: BadgeRule,
) -> Badge {
    Badge {
        id,
        group,
        title,
        description,
        rule,
    }
}

use BadgeGroup::{Combat, Fuel, Intel, Legacy, Strength};

/// Badge catalog in display order.
pub const BADGES: &[Badge] = &[
    badge("first_blood", Combat, "First Blood", "Complete your first workout.", BadgeRule::TotalWorkouts(1)),
    badge("century_club", Combat, "Century Club", "Perform 100 total reps in a single session.", BadgeRule::SessionReps(100)),
    badge("night_owl", Combat, "Night Owl", "Complete a workout after 10:00 PM.", BadgeRule::LateSession),
    badge("early_bird", Combat, "Early Bird", "Complete a workout before 7:00 AM.", BadgeRule::EarlySession),
    badge("consistency_king", Combat, "Consistency King", "Work out 4 days in a single week.", BadgeRule::TrainingDaysInWeek(4)),
    badge("speed_demon", Combat, "Speed Demon", "Finish a workout 2 minutes faster than the target time.", BadgeRule::BeatTargetBy(2)),
    badge("iron_discipline", Combat, "Iron Discipline", "Complete 10 total workouts.", BadgeRule::TotalWorkouts(10)),
    badge("protein_streak_3", Fuel, "Protein Pro", "Hit your protein goal 3 days in a row.", BadgeRule::ProteinStreak(3)),
    badge("protein_streak_7", Fuel, "Fuel Master", "Hit your protein goal 7 days in a row.", BadgeRule::ProteinStreak(7)),
    badge("pioneer", Fuel, "Powerfood Pioneer", "Log 5 different Powerfoods.", BadgeRule::DistinctPowerfoods(5)),
    badge("scale_master", Fuel, "Scale Master", "Log your weight every Monday for 4 weeks.", BadgeRule::MondayWeighIns(4)),
    badge("clean_eater", Fuel, "Clean Eater", "Log 20 meals in the food tracker.", BadgeRule::FoodLogs(20)),
    badge("photo_journalist", Fuel, "Photo Journalist", "Log 5 progress photos in the vault.", BadgeRule::ProgressPhotos(5)),
    badge("hydration_hero", Fuel, "Hydration Hero", "Log water intake for 5 consecutive days.", BadgeRule::Unimplemented),
    badge("heavy_hitter", Strength, "Heavy Hitter", "Log a weight entry for any exercise.", BadgeRule::AnyExerciseLog),
    badge("pr_machine", Strength, "PR Machine", "Hit 5 Personal Records in one week.", BadgeRule::PrsInWeek(5)),
    badge("volume_king", Strength, "Volume King", "Move 5,000 lbs total in a single session.", BadgeRule::SessionVolume(5000.0)),
    badge("titan_frame", Strength, "Titan Frame", "Reach \"Spartan\" rank in any exercise.", BadgeRule::SpartanRank),
    badge("explosive_power", Strength, "Explosive Power", "Log a Box Jump session.", BadgeRule::ExerciseLogged("Box Jump")),
    badge("iron_grip", Strength, "Iron Grip", "Log a Deadlift PR.", BadgeRule::SessionPr("Deadlift")),
    badge("unbreakable", Strength, "Unbreakable", "Complete a workout with \"Brutal\" mood selected.", BadgeRule::SessionMood(Mood::Brutal)),
    badge("ai_apprentice", Intel, "AI Apprentice", "Ask the AI Coach 5 questions.", BadgeRule::Activity(ActivityKind::CoachQuestion, 5)),
    badge("form_expert", Intel, "Form Expert", "Complete 3 AI Form Checks.", BadgeRule::Activity(ActivityKind::FormCheck, 3)),
    badge("pantry_scanner", Intel, "Pantry Scanner", "Use AI Photo Logger for 5 meals.", BadgeRule::AiFoodLogs(5)),
    badge("tactical_analyst", Intel, "Tactical Analyst", "View your Stats page 10 times.", BadgeRule::Activity(ActivityKind::StatsView, 10)),
    badge("recovery_specialist", Intel, "Recovery Specialist", "Complete a full Recovery Routine.", BadgeRule::Activity(ActivityKind::RecoveryRoutine, 1)),
    badge("stealth_operative", Intel, "Stealth Operative", "Complete 5 Office Mode workouts.", BadgeRule::WorkoutIdIs("office", 5)),
    badge("daily_scholar", Intel, "Daily Scholar", "Read 7 Daily Tips.", BadgeRule::Activity(ActivityKind::TipRead, 7)),
    badge("veteran", Legacy, "The Veteran", "Reach Level 5.", BadgeRule::Level(5)),
    badge("spartan_status", Legacy, "Spartan Status", "Reach Level 25.", BadgeRule::Level(25)),
    badge("elite_athlete", Legacy, "Elite Athlete", "Reach Level 50.", BadgeRule::Level(50)),
    badge("streak_3", Legacy, "Heating Up", "Maintain a 3-day workout streak.", BadgeRule::Streak(3)),
    badge("streak_7", Legacy, "Unstoppable", "Maintain a 7-day workout streak.", BadgeRule::Streak(7)),
    badge("road_warrior", Legacy, "Road Warrior", "Complete 3 \"Weightless\" workouts.", BadgeRule::WorkoutIdContains("weightless", 3)),
    badge("legendary", Legacy, "Legendary", "Complete 100 total workouts.", BadgeRule::TotalWorkouts(100)),
];

/// Look up a badge by id.
pub fn find_badge(id: &str) -> Option<&'static Badge> {
    BADGES.iter().find(|b| b.id == id)
}

/// Everything a predicate may inspect.
#[derive(Debug, Clone, Copy)]
pub struct BadgeContext<'a> {
    /// Post-mutation record
    pub record: &'a ProgressRecord,
    /// Session that triggered the evaluation
    pub session: Option<&'a WorkoutSession>,
    /// Day streak after the mutation
    pub streak: u32,
    pub now: DateTime<Utc>,
    pub offset: FixedOffset,
}

impl<'a> BadgeContext<'a> {
    fn local_hour(&self) -> u32 {
        self.session
            .map(|s| s.timestamp)
            .unwrap_or(self.now)
            .with_timezone(&self.offset)
            .hour()
    }

    fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    fn recent_sessions(&self) -> impl Iterator<Item = &'a WorkoutSession> + 'a {
        let cutoff = self.now - Duration::days(7);
        self.record.history.iter().filter(move |s| s.timestamp > cutoff)
    }

    fn workouts_matching(&self, pred: impl Fn(&str) -> bool) -> usize {
        self.record
            .history
            .iter()
            .filter(|s| pred(&s.workout_id))
            .count()
    }
}

/// Consecutive local days, ending today or yesterday, on which protein met
/// the goal.
pub fn protein_streak(entries: &[FoodLogEntry], goal: u32, today: NaiveDate, offset: FixedOffset) -> u32 {
    let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for entry in entries {
        let protein = entry.protein.filter(|p| p.is_finite()).unwrap_or(0.0);
        *per_day
            .entry(entry.timestamp.with_timezone(&offset).date_naive())
            .or_default() += protein;
    }
    let met = |day: NaiveDate| per_day.get(&day).is_some_and(|p| *p >= goal as f64);

    let mut day = if met(today) { today } else { today - Duration::days(1) };
    let mut streak = 0;
    while met(day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

/// Longest run of consecutive Mondays with a weigh-in.
fn longest_monday_run(record: &ProgressRecord) -> usize {
    let mondays: BTreeSet<NaiveDate> = record
        .weight_logs
        .iter()
        .map(|w| w.date)
        .filter(|d| d.weekday() == Weekday::Mon)
        .collect();

    let mut best = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for monday in mondays {
        run = match previous {
            Some(p) if (monday - p).num_days() == 7 => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(monday);
    }
    best
}

/// Whether a badge's rule holds for the context.
pub fn is_satisfied(badge: &Badge, ctx: &BadgeContext<'_>) -> bool {
    let record = ctx.record;
    match badge.rule {
        BadgeRule::TotalWorkouts(n) => record.history.len() >= n,
        BadgeRule::SessionReps(n) => ctx.session.is_some_and(|s| s.total_reps >= n),
        BadgeRule::SessionVolume(v) => ctx.session.is_some_and(|s| s.total_volume >= v),
        BadgeRule::LateSession => {
            let hour = ctx.local_hour();
            hour >= 22 || hour < 4
        }
        BadgeRule::EarlySession => (4..7).contains(&ctx.local_hour()),
        BadgeRule::TrainingDaysInWeek(n) => {
            let days: BTreeSet<NaiveDate> = ctx
                .recent_sessions()
                .map(|s| ctx.local_date(s.timestamp))
                .collect();
            days.len() >= n
        }
        BadgeRule::BeatTargetBy(minutes) => ctx.session.is_some_and(|s| {
            s.target_duration
                .is_some_and(|target| s.duration.saturating_add(minutes) <= target)
        }),
        BadgeRule::ProteinStreak(n) => {
            let today = ctx.local_date(ctx.now);
            protein_streak(&record.food_logs, record.protein_goal(), today, ctx.offset) >= n
        }
        BadgeRule::DistinctPowerfoods(n) => {
            let foods: BTreeSet<&str> = record
                .food_logs
                .iter()
                .filter(|f| f.kind == FoodKind::Powerfood)
                .map(|f| f.item.as_str())
                .collect();
            foods.len() >= n
        }
        BadgeRule::MondayWeighIns(n) => longest_monday_run(record) >= n,
        BadgeRule::FoodLogs(n) => record.food_logs.len() >= n,
        BadgeRule::AiFoodLogs(n) => record.food_logs.iter().filter(|f| f.is_ai).count() >= n,
        BadgeRule::ProgressPhotos(n) => record.photo_logs.len() >= n,
        BadgeRule::AnyExerciseLog => record.logs.values().any(|entries| !entries.is_empty()),
        BadgeRule::ExerciseLogged(exercise) => {
            record.logs.get(exercise).is_some_and(|entries| !entries.is_empty())
        }
        BadgeRule::PrsInWeek(n) => ctx.recent_sessions().map(|s| s.prs.len()).sum::<usize>() >= n,
        BadgeRule::SpartanRank => record.bests.iter().any(|(exercise, best)| {
            exercise_rank(exercise, *best)
                .and_then(|rank| rank.current)
                .is_some_and(|level| level.rank == "Spartan")
        }),
        BadgeRule::SessionPr(exercise) => {
            ctx.session.is_some_and(|s| s.prs.iter().any(|pr| pr.exercise == exercise))
        }
        BadgeRule::SessionMood(mood) => ctx.session.is_some_and(|s| s.mood == Some(mood)),
        BadgeRule::Activity(kind, n) => record.activity.count(kind) >= n,
        BadgeRule::WorkoutIdIs(id, n) => ctx.workouts_matching(|w| w == id) >= n,
        BadgeRule::WorkoutIdContains(fragment, n) => ctx.workouts_matching(|w| w.contains(fragment)) >= n,
        BadgeRule::Level(level) => record.level() >= level,
        BadgeRule::Streak(days) => ctx.streak >= days,
        BadgeRule::Unimplemented => false,
    }
}

/// Catalog badges not yet unlocked whose rule now holds.
pub fn evaluate_new_badges(ctx: &BadgeContext<'_>) -> Vec<&'static Badge> {
    BADGES
        .iter()
        .filter(|b| !ctx.record.has_badge(b.id))
        .filter(|b| is_satisfied(b, ctx))
        .collect()
}

/// Proximity hint shown while a workout is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveHint {
    pub badge_id: &'static str,
    pub message: String,
}

/// Hint when the running session is close to a single-session badge.
pub fn live_badge_hint(session: &SessionData, unlocked: &[String]) -> Option<LiveHint> {
    let locked = |id: &str| !unlocked.iter().any(|u| u == id);

    let reps = session.total_reps();
    if locked("century_club") {
        let remaining = 100u32.saturating_sub(reps);
        if remaining > 0 && remaining <= 15 && reps > 50 && reps % 5 == 0 {
            return Some(LiveHint {
                badge_id: "century_club",
                message: format!("{} reps until 'Century Club'", remaining),
            });
        }
    }

    let volume = session.total_volume();
    if locked("volume_king") {
        let remaining = 5000.0 - volume;
        if remaining > 0.0 && remaining <= 500.0 && volume > 3000.0 && ((volume / 100.0).floor() as u64) % 5 == 0 {
            return Some(LiveHint {
                badge_id: "volume_king",
                message: format!("{} lbs until 'Volume King'", remaining.round()),
            });
        }
    }

    None
}
