//! reqwest implementation of the remote collaborator traits.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use vitals_core::{
    AppError, AppResult, CompletionReply, CompletionRequest, CompletionService, ConfigError,
    ErrorCode, NutritionAnalysis, NutritionRequest, NutritionService, RecipeFilters,
    RecipeSearchResults, RecipeService, SpeechClip, SpeechService,
};

use crate::api_types::{
    ApiErrorBody, ChatRequestBody, ChatResponseBody, NutritionRequestBody, RecipeSearchBody,
    SpeechRequestBody,
};
use crate::config::ApiConfig;

pub const CHAT_PATH: &str = "/api/chat";
pub const TTS_PATH: &str = "/api/tts";
pub const NUTRITION_PATH: &str = "/api/nutrition/analyze";
pub const RECIPES_PATH: &str = "/api/recipes/search";

/// Client for the remote completion, speech, nutrition and recipe services.
///
/// Every failure is returned as an [`AppError`] carrying the code of the call
/// family: transport errors and non-2xx statuses map to the family code, and
/// bodies that do not decode map to `INVALID_RESPONSE`.
#[derive(Debug, Clone)]
pub struct WellnessApiClient {
    client: Client,
    config: ApiConfig,
}

impl WellnessApiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::Unusable {
                what: "HTTP client".to_string(),
                reason: e.to_string(),
            })?;

        info!(
            "Wellness API client initialized for {} (auth: {})",
            config.api_url,
            config.api_token.is_some()
        );

        Ok(Self { client, config })
    }

    /// Create a client from environment variables.
    ///
    /// See [`ApiConfig::from_env`] for the variables read.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(ApiConfig::from_env()?)
    }

    /// Get the configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// POST a JSON body and decode a JSON reply.
    async fn post_json<B, R>(&self, path: &str, body: &B, family: ErrorCode) -> AppResult<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        debug!(path, "Sending request to wellness API");

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            let err = AppError::from_code(family, format!("request to {} failed: {}", path, e))
                .with_context("path", path);
            if e.is_timeout() {
                err.with_context("timeout", "true")
            } else {
                err
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(path, status = status.as_u16(), "Wellness API returned an error");
            return Err(status_error(family, path, status, &error_text));
        }

        let bytes = response.bytes().await.map_err(|e| {
            AppError::from_code(family, format!("failed to read {} response: {}", path, e))
                .with_context("path", path)
        })?;

        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::invalid_response(format!("failed to parse {} response: {}", path, e))
                .with_context("path", path)
                .with_context("family", family.as_str())
        })
    }
}

fn status_error(family: ErrorCode, path: &str, status: StatusCode, body: &str) -> AppError {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.text().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    let message = if detail.is_empty() {
        format!("{} returned {}", path, status.as_u16())
    } else {
        format!("{} returned {}: {}", path, status.as_u16(), detail)
    };

    AppError::from_code(family, message)
        .with_context("path", path)
        .with_context("status", status.as_u16().to_string())
}

#[async_trait]
impl CompletionService for WellnessApiClient {
    async fn complete(&self, request: CompletionRequest) -> AppResult<CompletionReply> {
        let body = ChatRequestBody {
            message: &request.text,
            user_id: &request.user_id,
            session_id: request.session_id.as_deref(),
        };
        let reply: ChatResponseBody = self.post_json(CHAT_PATH, &body, ErrorCode::ApiError).await?;

        if reply.response.trim().is_empty() {
            return Err(AppError::invalid_response("completion reply has no text")
                .with_context("path", CHAT_PATH));
        }

        Ok(CompletionReply {
            response: reply.response,
            timestamp: reply.timestamp.unwrap_or_else(Utc::now),
            confidence: reply.confidence,
            detail: reply.detail,
        })
    }

    fn name(&self) -> &str {
        "WellnessApiClient"
    }
}

#[async_trait]
impl SpeechService for WellnessApiClient {
    async fn generate_speech(&self, text: &str, voice_id: Option<&str>) -> AppResult<SpeechClip> {
        let body = SpeechRequestBody { text, voice_id };
        self.post_json(TTS_PATH, &body, ErrorCode::TtsError).await
    }
}

#[async_trait]
impl NutritionService for WellnessApiClient {
    async fn analyze_nutrition(&self, request: &NutritionRequest) -> AppResult<NutritionAnalysis> {
        let body = NutritionRequestBody {
            food: &request.food,
            quantity: &request.quantity,
            user_id: &request.user_id,
            meal_type: request.meal_type,
        };
        self.post_json(NUTRITION_PATH, &body, ErrorCode::NutritionError)
            .await
    }
}

#[async_trait]
impl RecipeService for WellnessApiClient {
    async fn search_recipes(
        &self,
        query: &str,
        filters: &RecipeFilters,
    ) -> AppResult<RecipeSearchResults> {
        let body = RecipeSearchBody { query, filters };
        self.post_json(RECIPES_PATH, &body, ErrorCode::RecipeError).await
    }
}
