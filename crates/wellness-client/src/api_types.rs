//! Wire types for the remote services.
//!
//! Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vitals_core::{MealType, RecipeFilters};

/// `POST /api/chat` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody<'a> {
    pub message: &'a str,
    pub user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

/// `POST /api/chat` reply.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponseBody {
    pub response: String,
    /// Server time of the reply; the receive time is used when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// `POST /api/tts` body. The reply is a `SpeechClip`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRequestBody<'a> {
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<&'a str>,
}

/// `POST /api/nutrition/analyze` body. The reply is a `NutritionAnalysis`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionRequestBody<'a> {
    pub food: &'a str,
    pub quantity: &'a str,
    pub user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<MealType>,
}

/// `POST /api/recipes/search` body. The reply is a `RecipeSearchResults`.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeSearchBody<'a> {
    pub query: &'a str,
    #[serde(flatten)]
    pub filters: &'a RecipeFilters,
}

/// Error payload returned with non-2xx statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_body_omits_missing_session() {
        let body = ChatRequestBody {
            message: "hi",
            user_id: "u1",
            session_id: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"message": "hi", "userId": "u1"})
        );
    }

    #[test]
    fn test_chat_reply_minimal() {
        let reply: ChatResponseBody =
            serde_json::from_value(json!({"response": "Test AI response", "confidence": 0.95}))
                .unwrap();
        assert_eq!(reply.response, "Test AI response");
        assert_eq!(reply.confidence, Some(0.95));
        assert!(reply.timestamp.is_none());
    }

    #[test]
    fn test_recipe_body_flattens_filters() {
        let filters = RecipeFilters {
            max_calories: Some(500),
            low_glycemic: true,
            ..RecipeFilters::default()
        };
        let body = RecipeSearchBody {
            query: "salad",
            filters: &filters,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"query": "salad", "maxCalories": 500, "lowGlycemic": true})
        );
    }

    #[test]
    fn test_error_body_prefers_message() {
        let body: ApiErrorBody =
            serde_json::from_value(json!({"error": "not_found", "message": "Food not found"}))
                .unwrap();
        assert_eq!(body.text(), Some("Food not found"));
    }
}
