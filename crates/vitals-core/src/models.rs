//! Domain models shared by every crate in the workspace.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// A string did not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Physiological metric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    HeartRate,
    Steps,
    Sleep,
    Glucose,
    Hrv,
}

impl MetricType {
    pub const ALL: [MetricType; 5] = [
        MetricType::HeartRate,
        MetricType::Steps,
        MetricType::Sleep,
        MetricType::Glucose,
        MetricType::Hrv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::HeartRate => "heart_rate",
            MetricType::Steps => "steps",
            MetricType::Sleep => "sleep",
            MetricType::Glucose => "glucose",
            MetricType::Hrv => "hrv",
        }
    }

    /// Display unit for values of this metric.
    pub fn unit(&self) -> &'static str {
        match self {
            MetricType::HeartRate => "bpm",
            MetricType::Steps => "steps",
            MetricType::Sleep => "score",
            MetricType::Glucose => "mg/dL",
            MetricType::Hrv => "ms",
        }
    }

    /// Physiologically plausible bounds (inclusive) for synthesized values.
    pub fn plausible_range(&self) -> (f64, f64) {
        match self {
            MetricType::HeartRate => (55.0, 95.0),
            MetricType::Steps => (4000.0, f64::INFINITY),
            MetricType::Sleep => (60.0, 95.0),
            MetricType::Glucose => (70.0, 280.0),
            MetricType::Hrv => (25.0, 65.0),
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heart_rate" => Ok(MetricType::HeartRate),
            "steps" => Ok(MetricType::Steps),
            "sleep" => Ok(MetricType::Sleep),
            "glucose" => Ok(MetricType::Glucose),
            "hrv" => Ok(MetricType::Hrv),
            other => Err(ParseEnumError {
                kind: "metric type",
                value: other.to_string(),
            }),
        }
    }
}

/// Where an observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    Wearable,
    Cgm,
    Mock,
    Calculated,
}

impl MetricSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricSource::Wearable => "wearable",
            MetricSource::Cgm => "cgm",
            MetricSource::Mock => "mock",
            MetricSource::Calculated => "calculated",
        }
    }
}

impl fmt::Display for MetricSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricSource {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wearable" => Ok(MetricSource::Wearable),
            "cgm" => Ok(MetricSource::Cgm),
            "mock" => Ok(MetricSource::Mock),
            "calculated" => Ok(MetricSource::Calculated),
            other => Err(ParseEnumError {
                kind: "metric source",
                value: other.to_string(),
            }),
        }
    }
}

/// One observation of a metric for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetricRecord {
    pub user_id: String,
    pub metric_type: MetricType,
    pub value: f64,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
    pub source: MetricSource,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl HealthMetricRecord {
    /// Create a record; the unit is derived from the metric type.
    pub fn new(
        user_id: impl Into<String>,
        metric_type: MetricType,
        value: f64,
        timestamp: DateTime<Utc>,
        source: MetricSource,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            metric_type,
            value,
            unit: metric_type.unit().to_string(),
            timestamp,
            source,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Whether the value lies inside the metric's plausible range.
    pub fn is_plausible(&self) -> bool {
        let (min, max) = self.metric_type.plausible_range();
        self.value >= min && self.value <= max
    }
}

/// Filter for reading stored metrics. Results are returned newest first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricQuery {
    pub user_id: String,
    pub metric_type: Option<MetricType>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl MetricQuery {
    /// All metrics for a user.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            metric_type: None,
            since: None,
            limit: None,
        }
    }

    pub fn metric(mut self, metric_type: MetricType) -> Self {
        self.metric_type = Some(metric_type);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a record satisfies the type and `since` filters.
    pub fn matches(&self, record: &HealthMetricRecord) -> bool {
        record.user_id == self.user_id
            && self.metric_type.map_or(true, |t| t == record.metric_type)
            && self.since.map_or(true, |since| record.timestamp >= since)
    }

    /// Apply this query to an in-memory set of records.
    pub fn apply(&self, records: &[HealthMetricRecord]) -> Vec<HealthMetricRecord> {
        let mut selected: Vec<HealthMetricRecord> =
            records.iter().filter(|r| self.matches(r)).cloned().collect();
        selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = self.limit {
            selected.truncate(limit as usize);
        }
        selected
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

impl FromStr for ChatRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            other => Err(ParseEnumError {
                kind: "chat role",
                value: other.to_string(),
            }),
        }
    }
}

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Locally generated, never reused.
    pub id: String,
    pub session_id: String,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Optional extended-detail text attached to assistant replies.
    pub detail: Option<String>,
}

impl ChatMessage {
    /// A user message stamped with the current time and a fresh id.
    pub fn user(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            role: ChatRole::User,
            text: text.into(),
            timestamp: Utc::now(),
            detail: None,
        }
    }

    /// An assistant reply with a fresh id.
    pub fn assistant(
        session_id: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
        detail: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            role: ChatRole::Assistant,
            text: text.into(),
            timestamp,
            detail,
        }
    }
}

/// A conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub title: String,
    /// Summary of the latest message (the latest assistant reply).
    pub last_message: Option<String>,
    pub message_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            last_message: None,
            message_count: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Input to the completion collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub text: String,
    pub user_id: String,
    pub session_id: Option<String>,
}

/// Reply from the completion collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionReply {
    pub response: String,
    pub timestamp: DateTime<Utc>,
    pub confidence: Option<f64>,
    pub detail: Option<String>,
}

/// Synthesized audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechClip {
    /// Base64-encoded audio bytes.
    pub audio_data: String,
    pub content_type: String,
    /// Length in seconds.
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl FromStr for MealType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            other => Err(ParseEnumError {
                kind: "meal type",
                value: other.to_string(),
            }),
        }
    }
}

/// Input to the nutrition collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NutritionRequest {
    pub food: String,
    /// Free-form quantity, e.g. `"150g"` or `"1 cup"`.
    pub quantity: String,
    pub user_id: String,
    pub meal_type: Option<MealType>,
}

impl NutritionRequest {
    pub fn new(
        food: impl Into<String>,
        quantity: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            food: food.into(),
            quantity: quantity.into(),
            user_id: user_id.into(),
            meal_type: None,
        }
    }

    pub fn meal(mut self, meal_type: MealType) -> Self {
        self.meal_type = Some(meal_type);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionAnalysis {
    pub nutrition: NutritionFacts,
    /// Qualitative glycemic impact label (e.g. `low`, `moderate`, `high`).
    pub glycemic_impact: String,
    #[serde(default)]
    pub insights: Vec<String>,
}

/// Recipe search filters. Every field takes part in the cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_calories: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub low_glycemic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl RecipeFilters {
    /// Canonical string form used for cache keys.
    pub fn fingerprint(&self) -> String {
        format!(
            "diet={};max_calories={};low_glycemic={};limit={}",
            self.diet.as_deref().unwrap_or("-"),
            self.max_calories.map_or_else(|| "-".to_string(), |v| v.to_string()),
            self.low_glycemic,
            self.limit.map_or_else(|| "-".to_string(), |v| v.to_string()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub ready_in_minutes: Option<u32>,
    #[serde(default)]
    pub ingredients: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeSearchResults {
    pub recipes: Vec<Recipe>,
}
