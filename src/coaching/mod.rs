//! Training rules and the AI coach collaborator.
//!
//! Everything except `coach` is pure and synchronous.

pub mod brief;
pub mod coach;
pub mod difficulty;
pub mod fatigue;
pub mod milestones;
pub mod skills;

pub use brief::{fallback_brief, generate_insight, suggested_protein, weekly_comparison, DailyBrief};
pub use coach::{CoachContext, CoachError, CoachProvider, FormAnalysis, MealAnalysis, OfflineCoach};
pub use difficulty::{calculate_adaptive_difficulty, check_weight_suggestion, DifficultyBoost};
pub use fatigue::{check_fatigue_status, deload_weight, is_deload_complete, FatigueStatus};
pub use milestones::{check_milestone_achieved, exercise_rank, MilestoneHit};
