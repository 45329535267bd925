//! Unit test modules.

mod badge_rules_test;
mod engine_properties_test;
mod merge_score_test;
mod streak_test;
