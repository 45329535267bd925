//! Rank titles derived from level.

/// Levels per rank tier.
const LEVELS_PER_TIER: u64 = 10;

/// Rank title for a level.
pub fn rank_title(level: u64) -> &'static str {
    match level {
        50.. => "LIVING LEGEND",
        40..=49 => "TITAN",
        30..=39 => "SPARTAN",
        20..=29 => "WARRIOR",
        10..=19 => "ATHLETE",
        _ => "ROOKIE",
    }
}

/// Percent progress through the current tier toward the next title.
pub fn rank_progress(level: u64) -> f64 {
    if level >= 50 {
        return 100.0;
    }
    let into_tier = level % LEVELS_PER_TIER;
    into_tier as f64 / LEVELS_PER_TIER as f64 * 100.0
}
