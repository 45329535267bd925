//! Progress state: the canonical record and the engine that mutates it.

pub mod clock;
pub mod engine;
pub mod ranks;
pub mod streak;
pub mod types;
pub mod units;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{LinkOutcome, LoggedWeight, MergeOutcome, ProgressEngine, SessionPrs, WorkoutCompletion};
pub use ranks::{rank_progress, rank_title};
pub use streak::calculate_streak;
pub use types::*;
pub use units::{display_weight, kg_to_lbs, lbs_to_kg, WeightUnit};
