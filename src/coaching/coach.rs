//! AI coach collaborator contract.
//!
//! The coach is an external text generator. It is asked for free-form advice,
//! a one-line morning brief, and JSON analyses of meal photos and form videos.
//! Everything here tolerates the collaborator being unavailable.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::brief::{classify_ai_brief, fallback_brief, protein_on, yesterday_session, DailyBrief};
use crate::progress::streak::calculate_streak;
use crate::progress::types::{FoodEntry, FoodKind, Mood, Profile, ProgressRecord, WorkoutSession};

/// Sessions included in the coach context.
const CONTEXT_HISTORY: usize = 5;

/// Coach collaborator errors.
#[derive(Debug, Error)]
pub enum CoachError {
    #[error("Coach unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed coach response: {0}")]
    MalformedResponse(String),
}

impl From<serde_json::Error> for CoachError {
    fn from(e: serde_json::Error) -> Self {
        CoachError::MalformedResponse(e.to_string())
    }
}

/// Snapshot of the athlete handed to the coach with every request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachContext {
    pub profile: Option<Profile>,
    pub level: u64,
    pub streak: u32,
    /// Most recent sessions, newest first
    pub recent_history: Vec<WorkoutSession>,
    pub bests: BTreeMap<String, f64>,
    pub is_deload_week: bool,
    pub yesterday_mood: Option<Mood>,
    pub yesterday_protein: f64,
    pub protein_goal: u32,
}

impl CoachContext {
    /// Build the context from a record as seen at `now`.
    pub fn from_record(record: &ProgressRecord, now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let today = now.with_timezone(&offset).date_naive();
        let yesterday = today - chrono::Duration::days(1);
        Self {
            profile: record.profile.clone(),
            level: record.level(),
            streak: calculate_streak(&record.history, today, offset),
            recent_history: record.history.iter().take(CONTEXT_HISTORY).cloned().collect(),
            bests: record.bests.clone(),
            is_deload_week: record.in_deload(now),
            yesterday_mood: yesterday_session(record, today, offset).and_then(|s| s.mood),
            yesterday_protein: protein_on(&record.food_logs, yesterday, offset),
            protein_goal: record.protein_goal(),
        }
    }
}

/// Meal photo analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealAnalysis {
    pub items: Vec<String>,
    /// Detected items from the powerfoods list
    pub powerfoods: Vec<String>,
    /// Estimated protein in grams
    pub protein: f64,
    pub tip: String,
}

impl MealAnalysis {
    /// Food entry to log for this meal.
    pub fn to_food_entry(&self) -> FoodEntry {
        let title = if self.items.is_empty() {
            "Scanned meal".to_string()
        } else {
            self.items.join(", ")
        };
        FoodEntry::new(title)
            .with_kind(FoodKind::Meal)
            .with_protein(self.protein)
            .from_ai()
    }
}

/// Exercise form analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormAnalysis {
    pub pros: Vec<String>,
    pub corrections: Vec<String>,
    /// 1 to 10
    #[serde(deserialize_with = "deserialize_score")]
    pub safety_score: u8,
    pub coach_insight: String,
}

/// Accept integer, fractional or quoted scores, rounded into 0..=10.
fn deserialize_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(raw
        .filter(|v| v.is_finite())
        .map(|v| v.round().clamp(0.0, 10.0) as u8)
        .unwrap_or(0))
}

/// External text generator.
pub trait CoachProvider: Send + Sync {
    /// Free-form answer to an athlete question
    fn advice(
        &self,
        context: &CoachContext,
        query: &str,
    ) -> impl std::future::Future<Output = Result<String, CoachError>> + Send;

    /// One-sentence morning brief
    fn daily_brief(
        &self,
        context: &CoachContext,
    ) -> impl std::future::Future<Output = Result<String, CoachError>> + Send;

    /// Raw response for a base64 meal photo
    fn analyze_meal(
        &self,
        image_base64: &str,
    ) -> impl std::future::Future<Output = Result<String, CoachError>> + Send;

    /// Raw response for a base64 form video
    fn analyze_form(
        &self,
        video_base64: &str,
        mime_type: &str,
        exercise: &str,
    ) -> impl std::future::Future<Output = Result<String, CoachError>> + Send;
}

/// Coach used when no collaborator is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineCoach;

impl CoachProvider for OfflineCoach {
    async fn advice(&self, _context: &CoachContext, _query: &str) -> Result<String, CoachError> {
        Err(CoachError::Unavailable("offline".to_string()))
    }

    async fn daily_brief(&self, _context: &CoachContext) -> Result<String, CoachError> {
        Err(CoachError::Unavailable("offline".to_string()))
    }

    async fn analyze_meal(&self, _image_base64: &str) -> Result<String, CoachError> {
        Err(CoachError::Unavailable("offline".to_string()))
    }

    async fn analyze_form(
        &self,
        _video_base64: &str,
        _mime_type: &str,
        _exercise: &str,
    ) -> Result<String, CoachError> {
        Err(CoachError::Unavailable("offline".to_string()))
    }
}

/// Slice from the first `{` to the last `}`, or the whole text.
fn extract_json_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

/// Parse a meal analysis out of free text (code fences and prose tolerated).
pub fn parse_meal_analysis(text: &str) -> Result<MealAnalysis, CoachError> {
    Ok(serde_json::from_str(extract_json_object(text))?)
}

/// Parse a form analysis out of free text.
pub fn parse_form_analysis(text: &str) -> Result<FormAnalysis, CoachError> {
    let mut analysis: FormAnalysis = serde_json::from_str(extract_json_object(text))?;
    analysis.safety_score = analysis.safety_score.clamp(1, 10);
    Ok(analysis)
}

/// Send meal photo bytes to the coach and parse the reply.
pub async fn request_meal_analysis<C: CoachProvider>(
    coach: &C,
    image: &[u8],
) -> Result<MealAnalysis, CoachError> {
    let encoded = BASE64.encode(image);
    let raw = coach.analyze_meal(&encoded).await?;
    parse_meal_analysis(&raw)
}

/// Send form video bytes to the coach and parse the reply.
pub async fn request_form_analysis<C: CoachProvider>(
    coach: &C,
    video: &[u8],
    mime_type: &str,
    exercise: &str,
) -> Result<FormAnalysis, CoachError> {
    let encoded = BASE64.encode(video);
    let raw = coach.analyze_form(&encoded, mime_type, exercise).await?;
    parse_form_analysis(&raw)
}

/// Morning brief: coach first, rule-based fallback on any failure.
pub async fn generate_brief<C: CoachProvider>(
    coach: &C,
    record: &ProgressRecord,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> DailyBrief {
    let context = CoachContext::from_record(record, now, offset);
    let today = now.with_timezone(&offset).date_naive();
    match coach.daily_brief(&context).await {
        Ok(text) if !text.trim().is_empty() => classify_ai_brief(text.trim().to_string()),
        Ok(_) => fallback_brief(record, today, offset),
        Err(e) => {
            tracing::warn!("AI brief failed, using fallback: {}", e);
            fallback_brief(record, today, offset)
        }
    }
}
