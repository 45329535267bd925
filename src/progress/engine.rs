//! Progress State Engine.
//!
//! `ProgressEngine` owns the canonical [`ProgressRecord`] and is the only
//! place it is mutated. A mutation that changes persisted state ends in one
//! commit: the revision is bumped and the record goes to the sync gateway
//! (local write, then a queued remote write when an identity is linked).
//!
//! Mutations never fail on business rules. Malformed input is coerced and
//! storage failures are logged and reflected in `last_sync_success`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::ranks::rank_title;
use super::streak::calculate_streak;
use super::types::{
    max_set_weight, parse_weight, ActivityKind, CustomWorkout, ExerciseLogEntry, FoodEntry,
    FoodLogEntry, Mood, Notification, NotificationKind, PhotoLogEntry, PhotoSide, PrRecord,
    Profile, ProfileUpdate, ProgressRecord, SessionData, SetEntry, WeightLogEntry,
    WorkoutDefinition, WorkoutSession, DEFAULT_PROTEIN_GOAL, EXERCISE_LOG_LIMIT, FOOD_LOG_LIMIT,
    WEIGHT_LOG_LIMIT,
};
use super::units::WeightUnit;
use crate::coaching::brief::{fallback_brief, DailyBrief};
use crate::coaching::coach::{generate_brief, CoachProvider, MealAnalysis};
use crate::coaching::difficulty::{calculate_adaptive_difficulty, check_weight_suggestion};
use crate::coaching::fatigue::{
    check_fatigue_status, deload_weight, FatigueStatus, DELOAD_REDUCTION_FACTOR,
};
use crate::coaching::milestones::check_milestone_achieved;
use crate::social::badges::{evaluate_new_badges, BadgeContext};
use crate::storage::{AppConfig, LocalStore, StorageError, SyncSettings};
use crate::sync::{
    compare_data_sets, HttpRemoteStore, LeaderboardEntry, MergeComparison, RemoteIdentity,
    RemoteStore, SyncError, SyncGateway,
};

/// XP per completed set.
pub const XP_PER_SET: u64 = 15;

/// XP multiplier for a session with at least one PR.
pub const PR_XP_MULTIPLIER: u64 = 2;

/// Minutes per set when a session has no set data.
const MINUTES_PER_ESTIMATED_SET: u32 = 5;

/// Profile name given to accounts created without one.
const FALLBACK_PROFILE_NAME: &str = "Athlete";

/// Placeholder name replaced by the identity's display name.
const GUEST_PROFILE_NAME: &str = "Guest";

/// Storage folder for profile photos.
const PROFILE_PHOTO_FOLDER: &str = "profile-photos";

/// A finished workout to record.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutCompletion {
    pub workout_id: String,
    /// Minutes
    pub duration: u32,
    pub mood: Option<Mood>,
    pub session: Option<SessionData>,
    /// Planned duration in minutes
    pub target_duration: Option<u32>,
}

impl WorkoutCompletion {
    pub fn new(workout_id: impl Into<String>, duration: u32) -> Self {
        Self {
            workout_id: workout_id.into(),
            duration,
            mood: None,
            session: None,
            target_duration: None,
        }
    }

    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.mood = Some(mood);
        self
    }

    pub fn with_session(mut self, session: SessionData) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_target_duration(mut self, minutes: u32) -> Self {
        self.target_duration = Some(minutes);
        self
    }
}

/// Input to [`ProgressEngine::save_exercise_log`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoggedWeight {
    /// Full set detail; the entry weight is the heaviest set
    Sets(Vec<SetEntry>),
    /// Legacy single value
    Single(f64),
}

impl LoggedWeight {
    /// Single value from free text, zero when unparseable.
    pub fn from_text(raw: &str) -> Self {
        LoggedWeight::Single(parse_weight(raw).unwrap_or(0.0))
    }
}

/// PRs of the most recent session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionPrs<'a> {
    pub prs: &'a [PrRecord],
    pub xp_earned: u64,
    pub had_pr_bonus: bool,
}

/// Result of linking a remote identity.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
    /// No remote document existed; one was created from local progress
    Created,
    /// The remote copy was at least as far along and replaced local state
    Hydrated,
    /// Local progress scores higher; resolve with [`ProgressEngine::smart_merge`]
    LocalAhead {
        comparison: MergeComparison,
        cloud: Box<ProgressRecord>,
    },
    /// The remote store could not be read in time; local state is kept
    RemoteUnavailable,
}

/// Result of [`ProgressEngine::smart_merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Local progress was pushed over the remote copy
    Uploaded,
    /// The remote copy replaced local state
    Downloaded,
    /// Both copies scored equal; the remote copy was kept
    Synced,
}

impl MergeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeOutcome::Uploaded => "uploaded",
            MergeOutcome::Downloaded => "downloaded",
            MergeOutcome::Synced => "synced",
        }
    }
}

/// Owner of the canonical progress record.
pub struct ProgressEngine<R: RemoteStore = HttpRemoteStore> {
    record: ProgressRecord,
    gateway: SyncGateway<R>,
    clock: Arc<dyn Clock>,
}

impl<R: RemoteStore> ProgressEngine<R> {
    /// Open the engine over the configured local database.
    pub fn open(config: &AppConfig) -> Result<Self, StorageError> {
        let local = LocalStore::open(&config.database_path())?;
        let mut engine = Self::with_clock(local, config.sync.clone(), Arc::new(SystemClock));
        if engine.record.profile.is_none() {
            engine.record.settings.unit = config.display.unit;
        }
        Ok(engine)
    }

    /// Create an engine over a local store with an explicit clock.
    pub fn with_clock(local: LocalStore, settings: SyncSettings, clock: Arc<dyn Clock>) -> Self {
        let gateway = SyncGateway::new(local, settings, Arc::clone(&clock));
        let record = gateway.load_local();
        let mut engine = Self {
            record,
            gateway,
            clock,
        };
        if engine.record.expire_deload(engine.clock.now()) {
            tracing::info!("De-load period ended while away");
            engine.save_local_only();
        }
        engine
    }

    /// Current record.
    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    pub fn gateway(&self) -> &SyncGateway<R> {
        &self.gateway
    }

    // ========== Workout completion ==========

    /// Record a finished workout and run every progress rule over it.
    ///
    /// Returns the PRs set during the session.
    pub fn complete_workout(&mut self, completion: WorkoutCompletion) -> Vec<PrRecord> {
        let now = self.clock.now();
        let offset = self.clock.offset();
        let today = self.clock.local_date(now);
        let record = &mut self.record;

        if record.expire_deload(now) {
            tracing::info!("De-load period complete");
        }

        let mut prs = Vec::new();
        if let Some(session) = &completion.session {
            for exercise in &session.exercises {
                if exercise.exercise.trim().is_empty() || exercise.sets.is_empty() {
                    continue;
                }

                let max_weight = exercise.max_weight();
                let current_best = record.bests.get(&exercise.exercise).copied().unwrap_or(0.0);
                if max_weight <= 0.0 || max_weight <= current_best {
                    continue;
                }

                prs.push(PrRecord {
                    exercise: exercise.exercise.clone(),
                    value: max_weight,
                    previous_best: current_best,
                    unit: WeightUnit::Lbs,
                    timestamp: now,
                });

                if let Some(hit) =
                    check_milestone_achieved(&exercise.exercise, current_best, max_weight)
                {
                    tracing::info!(exercise = %hit.exercise, rank = hit.rank, "Milestone reached");
                    record.pending_notifications.push(Notification::new(
                        NotificationKind::Milestone,
                        hit.title(),
                        hit.message(),
                    ));
                }

                record.bests.insert(exercise.exercise.clone(), max_weight);
            }
        }

        let total_sets = match &completion.session {
            Some(session) => session.completed_sets(),
            None => completion.duration.div_ceil(MINUTES_PER_ESTIMATED_SET),
        };

        let had_pr_bonus = !prs.is_empty();
        let mut xp_earned = u64::from(total_sets) * XP_PER_SET;
        if had_pr_bonus {
            xp_earned *= PR_XP_MULTIPLIER;
        }

        let (total_reps, total_volume) = completion
            .session
            .as_ref()
            .map(|s| (s.total_reps(), s.total_volume()))
            .unwrap_or((0, 0.0));

        record.history.insert(
            0,
            WorkoutSession {
                workout_id: completion.workout_id.clone(),
                duration: completion.duration,
                timestamp: now,
                xp_earned,
                mood: completion.mood,
                prs: prs.clone(),
                had_pr_bonus,
                total_reps,
                total_volume,
                target_duration: completion.target_duration,
            },
        );
        record.xp = record.xp.saturating_add(xp_earned);

        let streak = calculate_streak(&record.history, today, offset);

        if completion.mood.is_some() {
            match check_fatigue_status(&record.history) {
                FatigueStatus::Deload if !record.is_deload_week => {
                    record.is_deload_week = true;
                    record.deload_start_date = Some(now);
                    record.pending_notifications = vec![Notification::new(
                        NotificationKind::Recovery,
                        "DE-LOAD INITIATED",
                        "You've been redlining. I've halved your weight targets for the next 7 days to allow for structural repair.",
                    )];
                    tracing::info!("Entering de-load week");
                }
                FatigueStatus::Warning => {
                    tracing::debug!("Fatigue warning: 2 of the last 3 sessions were brutal");
                }
                _ => {}
            }

            if !record.is_deload_week {
                if let Some(boost) = calculate_adaptive_difficulty(&record.history, &record.bests) {
                    for (exercise, target) in boost.targets {
                        let best = record.bests.entry(exercise).or_insert(0.0);
                        if target > *best {
                            *best = target;
                        }
                    }
                    record.last_difficulty_jump = Some(now);
                    record.pending_notifications.push(Notification::new(
                        NotificationKind::Upgrade,
                        "ADAPTIVE BOOST",
                        boost.message,
                    ));
                    tracing::info!("Adaptive boost applied to weight targets");
                }
            }
        }

        if had_pr_bonus {
            let mut notification = Notification::new(
                NotificationKind::Pr,
                "PERSONAL RECORD!",
                format!(
                    "You crushed {} PR{}! 2x XP bonus applied.",
                    prs.len(),
                    if prs.len() > 1 { "s" } else { "" }
                ),
            );
            notification.prs = prs.clone();
            record.pending_notifications.push(notification);
        }

        let unlocked: Vec<&'static str> = {
            let ctx = BadgeContext {
                record: &*record,
                session: record.history.first(),
                streak,
                now,
                offset,
            };
            evaluate_new_badges(&ctx).into_iter().map(|b| b.id).collect()
        };
        for id in unlocked {
            record.unlocked_badges.push(id.to_string());
            record.badge_unlocks.insert(id.to_string(), now);
            tracing::info!(badge = id, "Badge unlocked");
        }

        tracing::debug!(
            workout = %completion.workout_id,
            xp_earned,
            total_sets,
            prs = prs.len(),
            "Workout completed"
        );

        self.commit();
        prs
    }

    // ========== Logging ==========

    /// Log an exercise mid-workout. Does not detect PRs or badges.
    pub fn save_exercise_log(&mut self, exercise: &str, logged: LoggedWeight, unit: WeightUnit) {
        let date = self.clock.now();
        let entry = match logged {
            LoggedWeight::Sets(sets) => ExerciseLogEntry {
                date,
                weight: max_set_weight(&sets),
                unit,
                sets: Some(sets),
            },
            LoggedWeight::Single(weight) => ExerciseLogEntry {
                date,
                weight: if weight.is_finite() && weight >= 0.0 { weight } else { 0.0 },
                unit,
                sets: None,
            },
        };

        let entries = self.record.logs.entry(exercise.to_string()).or_default();
        entries.insert(0, entry);
        entries.truncate(EXERCISE_LOG_LIMIT);

        self.commit();
    }

    /// Most recent log entry for an exercise.
    pub fn get_last_log(&self, exercise: &str) -> Option<&ExerciseLogEntry> {
        self.record.logs.get(exercise).and_then(|entries| entries.first())
    }

    /// Log a food item and return its id.
    pub fn log_food(&mut self, food: FoodEntry) -> Uuid {
        let id = Uuid::new_v4();
        self.record.food_logs.insert(
            0,
            FoodLogEntry {
                id,
                item: food.title,
                kind: food.kind,
                timestamp: self.clock.now(),
                calories: food.calories.filter(|c| c.is_finite()),
                protein: food.protein.filter(|p| p.is_finite()),
                is_ai: food.is_ai,
            },
        );
        self.record.food_logs.truncate(FOOD_LOG_LIMIT);

        self.commit();
        id
    }

    /// Log a meal recognised by the coach.
    pub fn log_meal_analysis(&mut self, analysis: &MealAnalysis) -> Uuid {
        self.log_food(analysis.to_food_entry())
    }

    /// Log today's body weight, replacing an earlier entry for the same day.
    ///
    /// Returns `false` and changes nothing for a non-finite or negative value.
    pub fn log_weight(&mut self, value: f64) -> bool {
        if !value.is_finite() || value < 0.0 {
            return false;
        }

        let today = self.clock.today();
        let logs = &mut self.record.weight_logs;
        logs.retain(|entry| entry.date != today);
        logs.insert(0, WeightLogEntry { date: today, value });
        logs.truncate(WEIGHT_LOG_LIMIT);

        self.record.profile.get_or_insert_with(Profile::default).weight = Some(value);

        self.commit();
        true
    }

    /// [`ProgressEngine::log_weight`] from free text.
    pub fn log_weight_text(&mut self, raw: &str) -> bool {
        parse_weight(raw).is_some_and(|value| self.log_weight(value))
    }

    /// Record a progress photo reference.
    pub fn save_photo(&mut self, url: impl Into<String>, side: PhotoSide) -> Uuid {
        let id = Uuid::new_v4();
        self.record.photo_logs.insert(
            0,
            PhotoLogEntry {
                id,
                date: self.clock.today(),
                side,
                url: url.into(),
            },
        );

        self.commit();
        id
    }

    pub fn delete_photo(&mut self, id: Uuid) -> bool {
        let before = self.record.photo_logs.len();
        self.record.photo_logs.retain(|p| p.id != id);
        let removed = self.record.photo_logs.len() != before;
        if removed {
            self.commit();
        }
        removed
    }

    /// Count a tool use toward activity badges.
    pub fn record_activity(&mut self, kind: ActivityKind) {
        self.record.activity.increment(kind);
        self.commit();
    }

    // ========== Profile and settings ==========

    /// Merge fields into the profile, creating it if needed.
    pub fn update_profile(&mut self, update: ProfileUpdate) {
        update.apply_to(self.record.profile.get_or_insert_with(Profile::default));
        self.commit();
    }

    /// Replace the profile (onboarding).
    pub fn save_user_profile(&mut self, profile: Profile) {
        self.record.profile = Some(profile);
        self.commit();
    }

    /// Set the daily protein goal from free text; unparseable or zero input
    /// falls back to the default goal. Returns the stored goal.
    pub fn update_goal(&mut self, raw: &str) -> u32 {
        let digits: String = raw
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let goal = digits
            .parse::<u32>()
            .ok()
            .filter(|g| *g > 0)
            .unwrap_or(DEFAULT_PROTEIN_GOAL);

        self.update_profile(ProfileUpdate {
            daily_protein_goal: Some(goal),
            ..Default::default()
        });
        goal
    }

    /// Preferred display unit.
    pub fn display_unit(&self) -> WeightUnit {
        self.record
            .profile
            .as_ref()
            .map(|p| p.unit)
            .unwrap_or(self.record.settings.unit)
    }

    /// Switch between pounds and kilograms. Returns the new unit.
    pub fn toggle_units(&mut self) -> WeightUnit {
        let unit = self.display_unit().toggled();
        self.record.profile.get_or_insert_with(Profile::default).unit = unit;
        self.record.settings.unit = unit;
        self.commit();
        unit
    }

    /// Flip privacy mode. Returns the new value.
    pub fn toggle_privacy(&mut self) -> bool {
        let settings = &mut self.record.settings;
        settings.is_privacy_mode = !settings.is_privacy_mode;
        let enabled = settings.is_privacy_mode;
        self.commit();
        enabled
    }

    /// Store a profile photo and point the profile at it.
    ///
    /// Linked users upload to the remote store; guests get a data URL.
    pub async fn upload_profile_photo(
        &mut self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, SyncError> {
        let url = if self.gateway.is_linked() {
            self.gateway
                .upload_file(PROFILE_PHOTO_FOLDER, bytes, content_type)
                .await?
        } else {
            format!("data:{};base64,{}", content_type, BASE64.encode(&bytes))
        };

        self.update_profile(ProfileUpdate {
            photo_url: Some(url.clone()),
            ..Default::default()
        });
        Ok(url)
    }

    // ========== Workouts, bests and notifications ==========

    /// Save a user-authored workout and return its id.
    pub fn save_custom_workout(&mut self, definition: WorkoutDefinition) -> Uuid {
        let id = Uuid::new_v4();
        self.record.custom_workouts.push(CustomWorkout {
            id,
            name: definition.name,
            description: definition.description,
            exercises: definition.exercises,
            duration: definition.duration,
            created_at: self.clock.now(),
        });

        self.commit();
        id
    }

    pub fn delete_custom_workout(&mut self, id: Uuid) -> bool {
        let before = self.record.custom_workouts.len();
        self.record.custom_workouts.retain(|w| w.id != id);
        let removed = self.record.custom_workouts.len() != before;
        if removed {
            self.commit();
        }
        removed
    }

    /// Merge manually entered bests. Values never lower an existing best.
    pub fn update_bests(&mut self, bests: BTreeMap<String, f64>) {
        let mut changed = false;
        for (exercise, value) in bests {
            if !value.is_finite() {
                continue;
            }
            let best = self.record.bests.entry(exercise).or_insert(0.0);
            if value > *best {
                *best = value;
                changed = true;
            }
        }
        if changed {
            self.commit();
        }
    }

    /// Dismiss one pending notification.
    pub fn clear_notification(&mut self, index: usize) -> Option<Notification> {
        if index >= self.record.pending_notifications.len() {
            return None;
        }
        let removed = self.record.pending_notifications.remove(index);
        self.commit();
        Some(removed)
    }

    pub fn clear_all_notifications(&mut self) {
        self.record.pending_notifications.clear();
        self.commit();
    }

    /// Wipe all progress. Does nothing unless `confirmed`.
    pub fn reset_progress(&mut self, confirmed: bool) -> bool {
        if !confirmed {
            return false;
        }

        let revision = self.record.revision;
        self.record = ProgressRecord {
            revision,
            ..Default::default()
        };
        tracing::info!("Progress reset");

        self.commit();
        true
    }

    // ========== Queries ==========

    pub fn level(&self) -> u64 {
        self.record.level()
    }

    pub fn rank_title(&self) -> &'static str {
        rank_title(self.record.level())
    }

    /// Day streak as of now.
    pub fn streak(&self) -> u32 {
        calculate_streak(&self.record.history, self.clock.today(), self.clock.offset())
    }

    /// Best for an exercise: the stored best, else the heaviest logged load.
    pub fn get_user_best(&self, exercise: &str) -> f64 {
        if let Some(best) = self.record.bests.get(exercise).filter(|b| **b > 0.0) {
            return *best;
        }

        self.record
            .logs
            .get(exercise)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| match &entry.sets {
                        Some(sets) => max_set_weight(sets),
                        None => entry.weight,
                    })
                    .fold(0.0, f64::max)
            })
            .unwrap_or(0.0)
    }

    pub fn would_be_pr(&self, exercise: &str, weight: f64) -> bool {
        weight > self.record.bests.get(exercise).copied().unwrap_or(0.0)
    }

    /// PRs of the latest session, when it set any.
    pub fn get_last_session_prs(&self) -> Option<SessionPrs<'_>> {
        self.record
            .latest_session()
            .filter(|s| !s.prs.is_empty())
            .map(|s| SessionPrs {
                prs: &s.prs,
                xp_earned: s.xp_earned,
                had_pr_bonus: s.had_pr_bonus,
            })
    }

    pub fn fatigue_status(&self) -> FatigueStatus {
        check_fatigue_status(&self.record.history)
    }

    pub fn weight_suggestion(&self) -> Option<String> {
        check_weight_suggestion(&self.record.history)
    }

    /// Working target for an exercise, halved during a de-load week.
    pub fn target_weight(&self, exercise: &str) -> Option<f64> {
        let best = self.record.bests.get(exercise).copied()?;
        if self.record.in_deload(self.clock.now()) {
            Some(deload_weight(best, DELOAD_REDUCTION_FACTOR))
        } else {
            Some(best)
        }
    }

    /// Rule-based morning brief.
    pub fn daily_brief(&self) -> DailyBrief {
        fallback_brief(&self.record, self.clock.today(), self.clock.offset())
    }

    /// Morning brief from the coach, falling back to rules.
    pub async fn coached_brief<C: CoachProvider>(&self, coach: &C) -> DailyBrief {
        generate_brief(coach, &self.record, self.clock.now(), self.clock.offset()).await
    }

    // ========== Sync ==========

    /// Link a remote identity and reconcile with its stored document.
    ///
    /// A missing document is created from local progress. An existing one
    /// replaces local state unless local progress scores higher, in which
    /// case the caller confirms through [`ProgressEngine::smart_merge`].
    ///
    /// Remote writes stay paused until the remote copy has been read and
    /// resolved: after `LocalAhead` local mutations are kept locally until
    /// `smart_merge`, and after `RemoteUnavailable` until a
    /// [`ProgressEngine::retry_link`] succeeds.
    pub async fn link_identity(
        &mut self,
        identity: RemoteIdentity,
        store: Arc<R>,
    ) -> Result<LinkOutcome, SyncError> {
        self.gateway.link(identity.clone(), store)?;
        self.reconcile(identity).await
    }

    /// Read the remote document again for the linked identity and reconcile.
    pub async fn retry_link(&mut self) -> Result<LinkOutcome, SyncError> {
        let identity = self.gateway.identity().cloned().ok_or(SyncError::NotLinked)?;
        self.reconcile(identity).await
    }

    async fn reconcile(&mut self, identity: RemoteIdentity) -> Result<LinkOutcome, SyncError> {
        let document = match self.gateway.fetch_remote().await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("Remote hydration unavailable, keeping local progress: {}", e);
                self.record.last_sync_success = false;
                self.save_local_only();
                return Ok(LinkOutcome::RemoteUnavailable);
            }
        };

        let Some(document) = document else {
            let profile = self.record.profile.get_or_insert_with(Profile::default);
            profile.name = Some(
                identity
                    .preferred_name()
                    .unwrap_or_else(|| FALLBACK_PROFILE_NAME.to_string()),
            );
            profile.email = identity.email.clone();
            tracing::info!(uid = %identity.uid, "Creating remote document from local progress");
            self.gateway.resume_pushes();
            self.commit();
            return Ok(LinkOutcome::Created);
        };

        let mut cloud = ProgressRecord::hydrate(document);
        let renamed = adopt_display_name(&mut cloud, &identity);

        let comparison = compare_data_sets(&self.record, &cloud);
        if comparison.local_is_ahead() {
            tracing::info!(
                local = comparison.local_score,
                cloud = comparison.cloud_score,
                "Local progress is ahead of the remote copy"
            );
            return Ok(LinkOutcome::LocalAhead {
                comparison,
                cloud: Box::new(cloud),
            });
        }

        self.gateway.resume_pushes();
        self.adopt(cloud);
        if renamed {
            self.commit();
        }
        Ok(LinkOutcome::Hydrated)
    }

    /// Resolve local against remote progress by score.
    ///
    /// When local is ahead it is uploaded only if `confirm_upload`; otherwise,
    /// and whenever the remote copy scores at least as high, the remote copy
    /// becomes local state.
    pub fn smart_merge(&mut self, cloud: ProgressRecord, confirm_upload: bool) -> MergeOutcome {
        let comparison = compare_data_sets(&self.record, &cloud);
        self.gateway.resume_pushes();

        let outcome = if comparison.local_is_ahead() && confirm_upload {
            self.record.revision = self.record.revision.max(cloud.revision);
            self.commit();
            MergeOutcome::Uploaded
        } else {
            let outcome = if comparison.are_equal() {
                MergeOutcome::Synced
            } else {
                MergeOutcome::Downloaded
            };
            self.adopt(cloud);
            outcome
        };

        tracing::info!(
            outcome = outcome.as_str(),
            local = comparison.local_score,
            cloud = comparison.cloud_score,
            "Smart merge resolved"
        );
        outcome
    }

    /// Discard local state and reload the remote copy.
    ///
    /// Returns `Ok(false)` when no remote document exists.
    pub async fn force_resync(&mut self) -> Result<bool, SyncError> {
        match self.gateway.fetch_remote_unbounded().await? {
            Some(document) => {
                self.gateway.resume_pushes();
                self.adopt(ProgressRecord::hydrate(document));
                tracing::info!("Force resync restored remote progress");
                Ok(true)
            }
            None => {
                tracing::info!("Force resync found no remote progress");
                Ok(false)
            }
        }
    }

    /// Apply a document pushed by the remote store.
    ///
    /// Only a strictly newer revision replaces local state; echoes of our own
    /// writes and stale pushes are ignored.
    pub fn apply_remote_snapshot(&mut self, document: Value) -> bool {
        if self.gateway.pushes_paused() {
            tracing::debug!("Remote push ignored until the link is reconciled");
            return false;
        }

        let revision = document.get("revision").and_then(Value::as_u64).unwrap_or(0);

        if revision <= self.record.revision {
            if revision < self.record.revision {
                tracing::warn!(
                    remote = revision,
                    local = self.record.revision,
                    "Ignoring stale remote push"
                );
            }
            return false;
        }

        tracing::info!(remote = revision, local = self.record.revision, "Applying remote push");
        self.adopt(ProgressRecord::hydrate(document));
        true
    }

    /// Apply every pending remote push. Returns how many replaced local state.
    pub fn apply_remote_changes(&mut self) -> usize {
        self.gateway
            .take_remote_changes()
            .into_iter()
            .map(|document| self.apply_remote_snapshot(document))
            .filter(|applied| *applied)
            .count()
    }

    /// Fold finished remote writes into the sync status.
    pub fn refresh_sync_status(&mut self) {
        if self.absorb_sync_outcomes() {
            self.save_local_only();
        }
    }

    /// Wait for queued remote writes, then refresh the sync status.
    pub async fn flush(&mut self) {
        self.gateway.flush().await;
        self.refresh_sync_status();
    }

    /// Unlink the identity after queued writes finish.
    pub async fn unlink_identity(&mut self) {
        for outcome in self.gateway.unlink().await {
            self.apply_outcome(outcome.result);
        }
        self.save_local_only();
    }

    /// Top leaderboard entries.
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, SyncError> {
        self.gateway.leaderboard(limit).await
    }

    // ========== Internals ==========

    /// Replace local state with a remote copy, keeping device-local sync status.
    fn adopt(&mut self, mut incoming: ProgressRecord) {
        let now = self.clock.now();
        incoming.expire_deload(now);
        incoming.last_sync_success = true;
        incoming.last_sync_time = Some(now);
        self.record = incoming;
        self.save_local_only();
    }

    fn absorb_sync_outcomes(&mut self) -> bool {
        let outcomes = self.gateway.drain_outcomes();
        let changed = !outcomes.is_empty();
        for outcome in outcomes {
            self.apply_outcome(outcome.result);
        }
        changed
    }

    fn apply_outcome(&mut self, result: Result<DateTime<Utc>, String>) {
        match result {
            Ok(at) => {
                self.record.last_sync_success = true;
                self.record.last_sync_time = Some(at);
            }
            Err(_) => self.record.last_sync_success = false,
        }
    }

    fn save_local_only(&mut self) {
        if self.gateway.save_local_only(&self.record).is_err() {
            self.record.last_sync_success = false;
        }
    }

    fn commit(&mut self) {
        self.absorb_sync_outcomes();
        self.record.revision += 1;
        if self.gateway.persist(&self.record).is_err() {
            self.record.last_sync_success = false;
        }
    }
}

/// Replace a missing or placeholder profile name with the identity's
/// display name. Returns whether the name changed.
fn adopt_display_name(record: &mut ProgressRecord, identity: &RemoteIdentity) -> bool {
    let Some(display_name) = identity
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    else {
        return false;
    };

    let profile = record.profile.get_or_insert_with(Profile::default);
    let needs_name = match profile.name.as_deref() {
        None => true,
        Some(name) => name.trim().is_empty() || name == GUEST_PROFILE_NAME,
    };

    if needs_name {
        tracing::info!(name = display_name, "Replacing placeholder profile name");
        profile.name = Some(display_name.to_string());
    }
    needs_name
}
