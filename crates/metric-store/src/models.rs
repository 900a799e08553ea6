//! Row types and their mapping to domain values.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vitals_core::{ChatMessage, ChatSession, HealthMetricRecord};

use crate::error::DatabaseError;
use crate::Result;

/// A stored health metric observation.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct HealthMetricRow {
    pub id: i64,
    pub user_id: String,
    pub metric_type: String,
    pub value: f64,
    pub unit: String,
    /// Observation time in Unix milliseconds.
    pub recorded_at_ms: i64,
    pub source: String,
    /// JSON object text.
    pub metadata: String,
}

impl TryFrom<HealthMetricRow> for HealthMetricRecord {
    type Error = DatabaseError;

    fn try_from(row: HealthMetricRow) -> Result<Self> {
        let metadata: BTreeMap<String, serde_json::Value> = serde_json::from_str(&row.metadata)
            .map_err(|e| corrupt("health metric", e))?;

        Ok(HealthMetricRecord {
            metric_type: row.metric_type.parse().map_err(|e| corrupt("health metric", e))?,
            source: row.source.parse().map_err(|e| corrupt("health metric", e))?,
            timestamp: from_millis("health metric", row.recorded_at_ms)?,
            user_id: row.user_id,
            value: row.value,
            unit: row.unit,
            metadata,
        })
    }
}

/// A stored chat session.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ChatSessionRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub last_message: Option<String>,
    pub message_count: i64,
    pub updated_at_ms: i64,
}

impl TryFrom<ChatSessionRow> for ChatSession {
    type Error = DatabaseError;

    fn try_from(row: ChatSessionRow) -> Result<Self> {
        Ok(ChatSession {
            message_count: u32::try_from(row.message_count)
                .map_err(|e| corrupt("chat session", e))?,
            updated_at: from_millis("chat session", row.updated_at_ms)?,
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            last_message: row.last_message,
        })
    }
}

/// A stored chat message.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ChatMessageRow {
    pub id: String,
    pub session_id: String,
    pub role: String,
    pub text: String,
    pub sent_at_ms: i64,
    pub detail: Option<String>,
}

impl TryFrom<ChatMessageRow> for ChatMessage {
    type Error = DatabaseError;

    fn try_from(row: ChatMessageRow) -> Result<Self> {
        Ok(ChatMessage {
            role: row.role.parse().map_err(|e| corrupt("chat message", e))?,
            timestamp: from_millis("chat message", row.sent_at_ms)?,
            id: row.id,
            session_id: row.session_id,
            text: row.text,
            detail: row.detail,
        })
    }
}

/// Per-user profile settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: Option<String>,
    /// IANA zone name, informational only.
    pub timezone: Option<String>,
    /// Free-form fitness level ("athletic", "average", ...).
    pub fitness_level: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn corrupt(entity: &'static str, err: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::Corrupt {
        entity,
        reason: err.to_string(),
    }
}

fn from_millis(entity: &'static str, ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| DatabaseError::Corrupt {
        entity,
        reason: format!("timestamp out of range: {}", ms),
    })
}
