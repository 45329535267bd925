//! Strive - offline-first progress engine for gamified strength training
//!
//! Tracks XP and levels, personal records, badges and day streaks, runs the
//! adaptive difficulty and de-load rules on every completed workout, and
//! mirrors progress to a remote document store when an identity is linked.

pub mod coaching;
pub mod progress;
pub mod social;
pub mod storage;
pub mod sync;

// Re-export commonly used types
pub use progress::clock::{Clock, ManualClock, SystemClock};
pub use progress::engine::{LinkOutcome, MergeOutcome, ProgressEngine, WorkoutCompletion};
pub use progress::types::ProgressRecord;
pub use storage::config::AppConfig;
pub use sync::{HttpRemoteStore, InMemoryRemoteStore, RemoteIdentity, RemoteStore, SyncGateway};
