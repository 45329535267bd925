//! Daily brief and weekly insight text.
//!
//! The brief compares yesterday's output (workout) against yesterday's fuel
//! (protein). When the coach collaborator produces text it is classified by
//! tone; otherwise a deterministic message is chosen.

use chrono::{Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::progress::types::{FoodLogEntry, ProgressRecord, WorkoutSession};
use crate::progress::units::WeightUnit;

/// Fraction of the protein goal that counts as "met".
const PROTEIN_MET_RATIO: f64 = 0.8;

/// Visual tone of a brief.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BriefTone {
    Success,
    Caution,
    Info,
    Neutral,
    Recovery,
    Adjustment,
    Insight,
}

/// Morning brief shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBrief {
    pub title: String,
    pub message: String,
    pub tone: BriefTone,
    /// Produced by the coach collaborator
    pub is_ai: bool,
}

impl DailyBrief {
    fn new(title: &str, message: String, tone: BriefTone, is_ai: bool) -> Self {
        Self {
            title: title.to_string(),
            message,
            tone,
            is_ai,
        }
    }
}

/// Classify coach-authored brief text by tone.
pub fn classify_ai_brief(text: String) -> DailyBrief {
    let lower = text.to_lowercase();
    let recovery = lower.contains("recovery") || lower.contains("deload");
    let negative = lower.contains("missed") || lower.contains("deficit");

    if recovery {
        DailyBrief::new("STRATEGIC RECOVERY", text, BriefTone::Recovery, true)
    } else if negative {
        DailyBrief::new("TACTICAL ADJUSTMENT", text, BriefTone::Adjustment, true)
    } else {
        DailyBrief::new("AI COACH INSIGHT", text, BriefTone::Insight, true)
    }
}

fn food_on(entries: &[FoodLogEntry], day: NaiveDate, offset: FixedOffset) -> impl Iterator<Item = &FoodLogEntry> {
    entries
        .iter()
        .filter(move |f| f.timestamp.with_timezone(&offset).date_naive() == day)
}

fn sessions_on(history: &[WorkoutSession], day: NaiveDate, offset: FixedOffset) -> impl Iterator<Item = &WorkoutSession> {
    history
        .iter()
        .filter(move |s| s.timestamp.with_timezone(&offset).date_naive() == day)
}

/// Protein logged on a local calendar day.
pub fn protein_on(entries: &[FoodLogEntry], day: NaiveDate, offset: FixedOffset) -> f64 {
    food_on(entries, day, offset)
        .filter_map(|f| f.protein)
        .filter(|p| p.is_finite())
        .sum()
}

/// First session logged yesterday.
pub fn yesterday_session(record: &ProgressRecord, today: NaiveDate, offset: FixedOffset) -> Option<&WorkoutSession> {
    sessions_on(&record.history, today - Duration::days(1), offset).next()
}

/// Rule-based brief used when the coach is unavailable.
pub fn fallback_brief(record: &ProgressRecord, today: NaiveDate, offset: FixedOffset) -> DailyBrief {
    let yesterday = today - Duration::days(1);
    let did_workout = sessions_on(&record.history, yesterday, offset).next().is_some();
    let protein = protein_on(&record.food_logs, yesterday, offset);
    let goal = record.protein_goal();
    let protein_met = protein >= goal as f64 * PROTEIN_MET_RATIO;
    let grams = protein.round();

    match (did_workout, protein_met) {
        (true, true) => DailyBrief::new(
            "MISSION ACCOMPLISHED",
            format!(
                "Yesterday you crushed it: workout completed and {}g protein logged. Keep the momentum going.",
                grams
            ),
            BriefTone::Success,
            false,
        ),
        (true, false) => DailyBrief::new(
            "FUEL CHECK",
            format!(
                "Great workout yesterday, but only {}g protein (goal: {}g). Your muscles need fuel to grow.",
                grams, goal
            ),
            BriefTone::Caution,
            false,
        ),
        (false, true) => DailyBrief::new(
            "REST DAY NOTED",
            format!(
                "No workout logged yesterday, but nutrition was on point with {}g protein. Time to put that fuel to work.",
                grams
            ),
            BriefTone::Info,
            false,
        ),
        (false, false) => DailyBrief::new(
            "NEW DAY, NEW START",
            "Yesterday's in the past. Today is your opportunity to level up. Let's get after it.".to_string(),
            BriefTone::Neutral,
            false,
        ),
    }
}

/// One day of the weekly comparison chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayStats {
    pub date: NaiveDate,
    /// XP earned that day
    pub intensity: u64,
    /// Protein grams logged that day
    pub protein: f64,
    /// Body weight logged that day, zero when none
    pub weight: f64,
}

/// The last seven local days, oldest first, ending today.
pub fn weekly_comparison(record: &ProgressRecord, today: NaiveDate, offset: FixedOffset) -> Vec<DayStats> {
    (0..7)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            let intensity = sessions_on(&record.history, date, offset)
                .map(|s| s.xp_earned)
                .sum();
            let weight = record
                .weight_logs
                .iter()
                .find(|w| w.date == date)
                .map(|w| w.value)
                .unwrap_or(0.0);

            DayStats {
                date,
                intensity,
                protein: protein_on(&record.food_logs, date, offset),
                weight,
            }
        })
        .collect()
}

/// Coach insight for a week of stats.
pub fn generate_insight(data: &[DayStats], protein_goal: u32) -> &'static str {
    if data.is_empty() {
        return "Log your workouts and meals to see insights here.";
    }

    let total_protein: f64 = data.iter().map(|d| d.protein).sum();
    let total_work: u64 = data.iter().map(|d| d.intensity).sum();

    if total_work > 0 && total_protein == 0.0 {
        return "Warning: You're training hard but logging zero protein. Recovery will be slow.";
    }
    if total_work > 500 && total_protein < 100.0 {
        return "Great effort this week. Increase your protein from the Powerfoods list to see faster muscle growth.";
    }

    if let [.., previous, latest] = data {
        if latest.weight > 0.0 && previous.weight > 0.0 {
            if latest.weight > previous.weight && latest.protein >= protein_goal as f64 {
                return "Weight is up while hitting protein targets. This is high-quality muscle synthesis. Keep the intensity high!";
            }
            if latest.weight < previous.weight && latest.intensity > 500 {
                return "Weight is dropping while intensity is high. You are in a prime fat-burning state. Watch your protein to protect muscle.";
            }
        }
    }

    "Good balance. Keep your protein intake consistent to match your training intensity."
}

/// Training intensity used for protein targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingIntensity {
    Low,
    #[default]
    Moderate,
    High,
}

impl TrainingIntensity {
    /// Grams of protein per kg of body weight.
    pub fn protein_multiplier(&self) -> f64 {
        match self {
            TrainingIntensity::Low => 1.2,
            TrainingIntensity::Moderate => 1.6,
            TrainingIntensity::High => 2.0,
        }
    }
}

/// Suggested daily protein in grams.
pub fn suggested_protein(weight: f64, unit: WeightUnit, intensity: TrainingIntensity) -> u32 {
    if !weight.is_finite() || weight <= 0.0 {
        return 0;
    }
    let kg = match unit {
        WeightUnit::Lbs => weight * 0.453592,
        WeightUnit::Kg => weight,
    };
    (kg * intensity.protein_multiplier()).round() as u32
}
