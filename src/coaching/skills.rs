//! Skill tree: XP-gated workout tiers and exercise challenges.

use std::collections::BTreeMap;

use crate::progress::types::Profile;
use crate::progress::units::{kg_to_lbs, WeightUnit};

/// Body weight assumed when the profile has none (lbs).
pub const FALLBACK_BODY_WEIGHT: f64 = 180.0;

/// XP at which the tier bar is full.
pub const TIER_XP_CAP: u64 = 1000;

/// An XP-gated node in the workout tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkillNode {
    pub id: &'static str,
    pub title: &'static str,
    pub required_xp: u64,
    pub description: &'static str,
    /// Workout ids made available by this node
    pub unlocks: &'static [&'static str],
}

/// Workout tree in unlock order.
pub const SKILL_TREE: &[SkillNode] = &[
    SkillNode {
        id: "foundation",
        title: "The Foundation",
        required_xp: 0,
        description: "The journey begins. Unlocks 10 & 20 minute workouts.",
        unlocks: &["10-min-weight", "10-min-weightless", "20-min-weight", "20-min-weightless"],
    },
    SkillNode {
        id: "endurance-1",
        title: "Endurance I",
        required_xp: 250,
        description: "You can go the distance. Unlocks 30 minute routines.",
        unlocks: &["30-min-weight", "30-min-weightless"],
    },
    SkillNode {
        id: "hybrid",
        title: "Hybrid Training",
        required_xp: 500,
        description: "Mixing cardio and iron. Unlocks Fat-Burning Intervals.",
        unlocks: &["fat-burn-interval"],
    },
    SkillNode {
        id: "strength-1",
        title: "Heavy Lifter",
        required_xp: 750,
        description: "Serious volume. Unlocks 45 & 60 minute grinds.",
        unlocks: &["45-min-weight", "45-min-weightless", "60-min-weight", "60-min-weightless"],
    },
    SkillNode {
        id: "spartan",
        title: "Spartan Status",
        required_xp: 1000,
        description: "The ultimate test. Unlocks 90-minute workouts.",
        unlocks: &["90-min-weight", "90-min-weightless"],
    },
];

/// Nodes unlocked at an XP total.
pub fn unlocked_nodes(xp: u64) -> impl Iterator<Item = &'static SkillNode> {
    SKILL_TREE.iter().filter(move |n| xp >= n.required_xp)
}

/// Whether a workout id is available at an XP total. Workouts not gated by
/// the tree are always available.
pub fn is_workout_unlocked(workout_id: &str, xp: u64) -> bool {
    match SKILL_TREE.iter().find(|n| n.unlocks.contains(&workout_id)) {
        Some(node) => xp >= node.required_xp,
        None => true,
    }
}

/// Percent of the tier bar filled.
pub fn tier_progress(xp: u64) -> f64 {
    (xp as f64 / TIER_XP_CAP as f64 * 100.0).min(100.0)
}

/// How an exercise challenge is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementKind {
    /// Load as a multiple of body weight
    BodyWeightRatio,
    Reps,
    Seconds,
}

impl RequirementKind {
    /// Suffix shown after the target value.
    pub fn suffix(&self) -> &'static str {
        match self {
            RequirementKind::BodyWeightRatio => "x BW",
            RequirementKind::Seconds => "s",
            RequirementKind::Reps => "",
        }
    }
}

/// Exercise challenge attached to a branch skill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkillRequirement {
    pub exercise: &'static str,
    pub value: f64,
    pub kind: RequirementKind,
}

/// Skill branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillBranch {
    Power,
    Armor,
    Strike,
}

impl SkillBranch {
    pub fn label(&self) -> &'static str {
        match self {
            SkillBranch::Power => "POWER",
            SkillBranch::Armor => "ARMOR",
            SkillBranch::Strike => "STRIKE",
        }
    }
}

/// A challenge skill unlocked by hitting an exercise target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchSkill {
    pub id: &'static str,
    pub name: &'static str,
    pub branch: SkillBranch,
    pub requirement: SkillRequirement,
    pub perk: &'static str,
}

const fn skill(
    id: &'static str,
    name: &'static str,
    branch: SkillBranch,
    exercise: &'static str,
    value: f64,
    kind: RequirementKind,
    perk: &'static str,
) -> BranchSkill {
    BranchSkill {
        id,
        name,
        branch,
        requirement: SkillRequirement { exercise, value, kind },
        perk,
    }
}

/// Branch skills.
pub const BRANCH_SKILLS: &[BranchSkill] = &[
    skill("p1", "Piston Power", SkillBranch::Power, "Squat", 1.5, RequirementKind::BodyWeightRatio, "+10% XP on Leg Days"),
    skill("p2", "Earthquake", SkillBranch::Power, "Deadlift", 2.0, RequirementKind::BodyWeightRatio, "Unlocks \"Heavy Metal\" Missions"),
    skill("a1", "Iron Curtain", SkillBranch::Armor, "Plank Hold", 180.0, RequirementKind::Seconds, "Unlocks \"Advanced Core\" Missions"),
    skill("a2", "Unbreakable", SkillBranch::Armor, "Leg Raise", 50.0, RequirementKind::Reps, "Immune to Rest Timer penalties"),
    skill("s1", "Apex Strike", SkillBranch::Strike, "Pushups", 50.0, RequirementKind::Reps, "-5s Rest Timer penalty"),
    skill("s2", "Sky Walker", SkillBranch::Strike, "Pull-ups", 15.0, RequirementKind::Reps, "Unlocks \"Aerial Combat\" Missions"),
];

/// Profile body weight in pounds, or the fallback.
fn body_weight_lbs(profile: Option<&Profile>) -> f64 {
    profile
        .and_then(|p| {
            p.weight.filter(|w| *w > 0.0).map(|w| match p.unit {
                WeightUnit::Lbs => w,
                WeightUnit::Kg => kg_to_lbs(w),
            })
        })
        .unwrap_or(FALLBACK_BODY_WEIGHT)
}

impl BranchSkill {
    /// Absolute target for the requirement.
    pub fn target(&self, profile: Option<&Profile>) -> f64 {
        match self.requirement.kind {
            RequirementKind::BodyWeightRatio => body_weight_lbs(profile) * self.requirement.value,
            RequirementKind::Reps | RequirementKind::Seconds => self.requirement.value,
        }
    }

    pub fn is_unlocked(&self, bests: &BTreeMap<String, f64>, profile: Option<&Profile>) -> bool {
        let best = bests.get(self.requirement.exercise).copied().unwrap_or(0.0);
        best >= self.target(profile)
    }

    /// Rounded percent toward the target, capped at 100.
    pub fn progress(&self, bests: &BTreeMap<String, f64>, profile: Option<&Profile>) -> u32 {
        let best = bests.get(self.requirement.exercise).copied().unwrap_or(0.0);
        let target = self.target(profile);
        if target <= 0.0 {
            return 100;
        }
        (best / target * 100.0).round().clamp(0.0, 100.0) as u32
    }
}
