//! Achievements.
//!
//! Provides the badge catalog and unlock evaluation.

pub mod badges;

pub use badges::{evaluate_new_badges, find_badge, Badge, BadgeContext, BadgeGroup, BadgeRule, BADGES};
