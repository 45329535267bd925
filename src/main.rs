//! Strive - offline-first progress engine for gamified strength training
//!
//! Main entry point: loads configuration and local progress, then prints a
//! status summary.

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use strive::coaching::fatigue::FatigueStatus;
use strive::coaching::skills::{tier_progress, unlocked_nodes};
use strive::progress::rank_progress;
use strive::progress::units::display_weight;
use strive::storage::load_config;
use strive::{HttpRemoteStore, ProgressEngine};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Strive v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("failed to load configuration")?;
    let engine = ProgressEngine::<HttpRemoteStore>::open(&config).with_context(|| {
        format!("failed to open {}", config.database_path().display())
    })?;

    let record = engine.record();
    let unit = engine.display_unit();
    let name = record
        .profile
        .as_ref()
        .and_then(|p| p.name.as_deref())
        .unwrap_or("Guest");

    println!("{} - {} (level {})", name, engine.rank_title(), engine.level());
    println!("XP: {}  Streak: {} day(s)  Workouts: {}", record.xp, engine.streak(), record.history.len());
    println!("Badges: {}  Rank progress: {:.0}%", record.unlocked_badges.len(), rank_progress(engine.level()));

    let unlocked: Vec<&str> = unlocked_nodes(record.xp).map(|n| n.title).collect();
    println!("Skill tree ({:.0}%): {}", tier_progress(record.xp), unlocked.join(", "));

    for (exercise, best) in &record.bests {
        println!("  {:<20} {:>7.1} {}", exercise, display_weight(*best, unit), unit.label());
    }

    let fatigue = engine.fatigue_status();
    if fatigue != FatigueStatus::Clear {
        println!("{}: {}", fatigue.label(), fatigue.message());
    }
    if let Some(suggestion) = engine.weight_suggestion() {
        println!("{}", suggestion);
    }

    let brief = engine.daily_brief();
    println!("{}: {}", brief.title, brief.message);

    for notification in &record.pending_notifications {
        println!("[{}] {}", notification.title, notification.message);
    }

    match &config.sync.remote_url {
        Some(url) => tracing::info!(%url, "Remote sync configured"),
        None => tracing::info!("Running offline; no remote configured"),
    }

    Ok(())
}
