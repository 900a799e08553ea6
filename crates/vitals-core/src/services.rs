//! Collaborator traits.
//!
//! The service layer talks to the outside world only through these traits.
//! Implementations convert their own failures into [`AppError`] with the
//! code of their call family before returning.

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{
    ChatMessage, ChatSession, CompletionReply, CompletionRequest, HealthMetricRecord,
    MetricQuery, NutritionAnalysis, NutritionRequest, RecipeFilters, RecipeSearchResults,
    SpeechClip,
};

/// Produces assistant replies. Failures map to `API_ERROR`.
///
/// This trait is object-safe and can be used with `Arc<dyn CompletionService>`.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> AppResult<CompletionReply>;

    /// Human-readable name of the implementation.
    fn name(&self) -> &str;
}

/// Text-to-speech. Failures map to `TTS_ERROR`.
#[async_trait]
pub trait SpeechService: Send + Sync {
    async fn generate_speech(&self, text: &str, voice_id: Option<&str>) -> AppResult<SpeechClip>;
}

/// Food analysis. Failures map to `NUTRITION_ERROR`.
#[async_trait]
pub trait NutritionService: Send + Sync {
    async fn analyze_nutrition(&self, request: &NutritionRequest) -> AppResult<NutritionAnalysis>;
}

/// Recipe lookup. Failures map to `RECIPE_ERROR`.
#[async_trait]
pub trait RecipeService: Send + Sync {
    async fn search_recipes(
        &self,
        query: &str,
        filters: &RecipeFilters,
    ) -> AppResult<RecipeSearchResults>;
}

/// Persistent storage for health metrics. Failures map to `DATABASE_ERROR`.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Persist a batch of records as one unit.
    ///
    /// Either the whole batch is stored and its size returned, or an error
    /// is returned and nothing from the batch is stored. Writing a record
    /// that already exists (same user, type and timestamp) replaces it.
    async fn insert_metrics(&self, records: &[HealthMetricRecord]) -> AppResult<usize>;

    /// Read records matching the query, newest first.
    async fn list_metrics(&self, query: &MetricQuery) -> AppResult<Vec<HealthMetricRecord>>;

    /// Number of stored records for a user.
    async fn count_metrics(&self, user_id: &str) -> AppResult<u64>;
}

/// Persistent storage for chat sessions and messages. Failures map to
/// `DATABASE_ERROR`.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn create_session(&self, session: &ChatSession) -> AppResult<()>;

    async fn update_session(&self, session: &ChatSession) -> AppResult<()>;

    /// Sessions for a user, most recently updated first.
    async fn list_sessions(&self, user_id: &str) -> AppResult<Vec<ChatSession>>;

    async fn get_session(&self, session_id: &str) -> AppResult<Option<ChatSession>>;

    async fn append_messages(&self, messages: &[ChatMessage]) -> AppResult<()>;

    /// Messages of a session in send order.
    async fn list_messages(&self, session_id: &str) -> AppResult<Vec<ChatMessage>>;
}
