//! The service facade the dashboard talks to.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use telemetry_synth::{HistoryOptions, SubjectProfile, Synthesizer};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use vitals_core::{
    AppError, AppResult, ChatStore, CompletionService, ErrorHandler, HealthMetricRecord,
    LoggingNotifier, MetricQuery, MetricStore, Notifier, NutritionAnalysis, NutritionRequest,
    NutritionService, OperationTimer, RecipeFilters, RecipeSearchResults, RecipeService,
    SpeechClip, SpeechService,
};

use crate::batch::{BatchReport, BatchWriter};
use crate::cache_service::{metrics_key, nutrition_key, recipe_key, summary_key, CacheService};
use crate::chat::{ChatExchange, ChatSessionService};
use crate::config::ServiceConfig;
use crate::locks::KeyedLocks;
use crate::summary::{insights, Insight, MetricsSummary};

/// External collaborators of [`WellnessService`].
pub struct Collaborators {
    pub metrics: Arc<dyn MetricStore>,
    pub chats: Arc<dyn ChatStore>,
    pub completion: Arc<dyn CompletionService>,
    pub nutrition: Arc<dyn NutritionService>,
    pub recipes: Arc<dyn RecipeService>,
    pub speech: Arc<dyn SpeechService>,
    /// Receives medium and high severity notices; logging only when unset.
    pub notifier: Option<Arc<dyn Notifier>>,
}

/// Where the records of a metric read came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Cache,
    Stored,
    /// Synthesized for an empty history, stored, then read back.
    Seeded,
    /// Synthesized because the store failed. Neither stored nor cached.
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsResponse {
    pub records: Vec<HealthMetricRecord>,
    pub source: DataSource,
}

/// Result of [`WellnessService::ensure_seeded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The user already had this many records; nothing was written.
    AlreadySeeded(u64),
    Seeded(BatchReport),
}

/// Entry point for every dashboard operation.
///
/// Owns the caches, the timer, the error handler and the current chat
/// session. Data-fetch paths fall back to synthetic data on medium and low
/// severity failures; high severity failures propagate.
pub struct WellnessService {
    config: ServiceConfig,
    cache: Arc<CacheService>,
    timer: Arc<OperationTimer>,
    handler: Arc<ErrorHandler>,
    metrics: Arc<dyn MetricStore>,
    nutrition: Arc<dyn NutritionService>,
    recipes: Arc<dyn RecipeService>,
    speech: Arc<dyn SpeechService>,
    chat: ChatSessionService,
    batch: BatchWriter,
    seed_locks: KeyedLocks,
    synth: Mutex<Synthesizer>,
    profiles: Mutex<HashMap<String, SubjectProfile>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl WellnessService {
    pub fn new(config: ServiceConfig, collaborators: Collaborators) -> Self {
        let notifier = collaborators
            .notifier
            .unwrap_or_else(|| Arc::new(LoggingNotifier));
        let handler = Arc::new(ErrorHandler::new(notifier));
        let cache = Arc::new(CacheService::new(&config));
        let timer = Arc::new(OperationTimer::new());

        let chat = ChatSessionService::new(
            collaborators.completion,
            collaborators.chats,
            cache.clone(),
            timer.clone(),
            handler.clone(),
            config.call_timeout,
        );
        let batch = BatchWriter::new(collaborators.metrics.clone(), config.batch_chunk_size);
        let synth = match config.synth_seed {
            Some(seed) => Synthesizer::seeded(seed),
            None => Synthesizer::from_entropy(),
        };

        info!(
            chunk_size = config.batch_chunk_size,
            history_days = config.history_days,
            "Wellness service ready"
        );

        Self {
            config,
            cache,
            timer,
            handler,
            metrics: collaborators.metrics,
            nutrition: collaborators.nutrition,
            recipes: collaborators.recipes,
            speech: collaborators.speech,
            chat,
            batch,
            seed_locks: KeyedLocks::new(),
            synth: Mutex::new(synth),
            profiles: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    pub fn timer(&self) -> &OperationTimer {
        &self.timer
    }

    pub fn handler(&self) -> &ErrorHandler {
        &self.handler
    }

    pub fn chat(&self) -> &ChatSessionService {
        &self.chat
    }

    /// Profile used when synthesizing data for this user.
    pub fn register_profile(&self, user_id: &str, profile: SubjectProfile) {
        lock(&self.profiles).insert(user_id.to_string(), profile);
    }

    fn profile_for(&self, user_id: &str) -> SubjectProfile {
        lock(&self.profiles)
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    fn history_options(&self) -> HistoryOptions {
        HistoryOptions::days(self.config.history_days)
    }

    fn synthesize(&self, user_id: &str) -> Vec<HealthMetricRecord> {
        let profile = self.profile_for(user_id);
        let mut synth = lock(&self.synth);
        synth.set_profile(profile);
        synth.history(user_id, Utc::now(), &self.history_options())
    }

    /// Synthesize a history for a user and write it in chunks.
    pub async fn seed_history(&self, user_id: &str) -> BatchReport {
        let records = self.synthesize(user_id);
        let report = self.batch.write(&records).await;
        self.cache.invalidate_user(user_id).await;

        info!(
            user_id = %user_id,
            attempted = report.attempted,
            persisted = report.persisted,
            "Seeded synthetic history"
        );
        report
    }

    /// Seed a user with synthetic history if they have no stored records.
    ///
    /// Concurrent calls for one user seed at most once.
    pub async fn ensure_seeded(&self, user_id: &str) -> AppResult<SeedOutcome> {
        let _guard = self.seed_locks.lock(user_id).await;

        let count = self
            .timer
            .measure_with_timeout(
                "metrics.count",
                self.config.call_timeout,
                self.metrics.count_metrics(user_id),
            )
            .await
            .map_err(|e| e.in_component("wellness").during("ensure_seeded"))?;
        if count > 0 {
            return Ok(SeedOutcome::AlreadySeeded(count));
        }

        Ok(SeedOutcome::Seeded(self.seed_history(user_id).await))
    }

    async fn read_metrics(&self, query: &MetricQuery) -> AppResult<Vec<HealthMetricRecord>> {
        self.timer
            .measure_with_timeout(
                "metrics.list",
                self.config.call_timeout,
                self.metrics.list_metrics(query),
            )
            .await
            .map_err(|e| {
                e.in_component("wellness")
                    .during("get_metrics")
                    .with_context("user_id", &query.user_id)
            })
    }

    async fn fetch_metrics(
        &self,
        query: &MetricQuery,
    ) -> AppResult<(Vec<HealthMetricRecord>, DataSource)> {
        let records = self.read_metrics(query).await?;
        if !records.is_empty() {
            return Ok((records, DataSource::Stored));
        }
        let source = match self.ensure_seeded(&query.user_id).await? {
            SeedOutcome::Seeded(_) => DataSource::Seeded,
            SeedOutcome::AlreadySeeded(_) => DataSource::Stored,
        };
        Ok((self.read_metrics(query).await?, source))
    }

    /// Read metrics, seeding an empty history and falling back to
    /// synthetic data when the store is unavailable.
    pub async fn get_metrics(&self, query: &MetricQuery) -> AppResult<MetricsResponse> {
        let key = metrics_key(query);
        if let Some(records) = self.cache.metrics.get(&key).await {
            return Ok(MetricsResponse {
                records,
                source: DataSource::Cache,
            });
        }

        let computed_at = Instant::now();
        let response = self.resolve_metrics(query).await?;
        if response.source != DataSource::Synthetic && !response.records.is_empty() {
            self.cache
                .metrics
                .set_computed_at(
                    &key,
                    response.records.clone(),
                    self.cache.telemetry_ttl(),
                    computed_at,
                )
                .await;
        }
        Ok(response)
    }

    /// Uncached read behind [`get_metrics`](Self::get_metrics).
    async fn resolve_metrics(&self, query: &MetricQuery) -> AppResult<MetricsResponse> {
        match self.fetch_metrics(query).await {
            Ok((records, source)) => Ok(MetricsResponse { records, source }),
            Err(e) => {
                let outcome = self.handler.handle(&e);
                if !outcome.fallback_allowed {
                    return Err(e);
                }
                warn!(
                    user_id = %query.user_id,
                    code = %e.code(),
                    "Serving synthetic metrics"
                );
                let records = query.apply(&self.synthesize(&query.user_id));
                Ok(MetricsResponse {
                    records,
                    source: DataSource::Synthetic,
                })
            }
        }
    }

    /// Per-metric aggregates over the configured history window.
    pub async fn metrics_summary(&self, user_id: &str) -> AppResult<MetricsSummary> {
        let key = summary_key(user_id);
        if let Some(summary) = self.cache.summaries.get(&key).await {
            return Ok(summary);
        }

        let computed_at = Instant::now();
        let now = Utc::now();
        let since = now - ChronoDuration::days(i64::from(self.config.history_days));
        // The summary cache covers this read; a metrics entry keyed on a
        // moving `since` would never be hit again.
        let response = self
            .resolve_metrics(&MetricQuery::for_user(user_id).since(since))
            .await?;
        let summary = MetricsSummary::from_records(user_id, &response.records, now);

        if response.source != DataSource::Synthetic {
            self.cache
                .summaries
                .set_computed_at(&key, summary.clone(), self.cache.telemetry_ttl(), computed_at)
                .await;
        }
        debug!(user_id = %user_id, metrics = summary.metrics.len(), "Built metrics summary");
        Ok(summary)
    }

    pub async fn insights(&self, user_id: &str) -> AppResult<Vec<Insight>> {
        Ok(insights(&self.metrics_summary(user_id).await?))
    }

    pub async fn analyze_nutrition(&self, request: &NutritionRequest) -> AppResult<NutritionAnalysis> {
        if request.food.trim().is_empty() {
            let e = AppError::validation("food name is empty").in_component("nutrition");
            self.handler.handle(&e);
            return Err(e);
        }

        let key = nutrition_key(request);
        if let Some(analysis) = self.cache.nutrition.get(&key).await {
            return Ok(analysis);
        }

        let computed_at = Instant::now();
        let result = self
            .timer
            .measure_with_timeout(
                "nutrition.analyze",
                self.config.call_timeout,
                self.nutrition.analyze_nutrition(request),
            )
            .await;

        match result {
            Ok(analysis) => {
                self.cache
                    .nutrition
                    .set_computed_at(&key, analysis.clone(), self.cache.nutrition_ttl(), computed_at)
                    .await;
                Ok(analysis)
            }
            Err(e) => Err(self.reject(e, "nutrition", "analyze_nutrition")),
        }
    }

    pub async fn search_recipes(
        &self,
        query: &str,
        filters: &RecipeFilters,
    ) -> AppResult<RecipeSearchResults> {
        let key = recipe_key(query, filters);
        if let Some(results) = self.cache.recipes.get(&key).await {
            return Ok(results);
        }

        let computed_at = Instant::now();
        let result = self
            .timer
            .measure_with_timeout(
                "recipes.search",
                self.config.call_timeout,
                self.recipes.search_recipes(query, filters),
            )
            .await;

        match result {
            Ok(results) => {
                self.cache
                    .recipes
                    .set_computed_at(&key, results.clone(), self.cache.recipe_ttl(), computed_at)
                    .await;
                Ok(results)
            }
            Err(e) => Err(self.reject(e, "recipes", "search_recipes")),
        }
    }

    pub async fn generate_speech(&self, text: &str, voice_id: Option<&str>) -> AppResult<SpeechClip> {
        self.timer
            .measure_with_timeout(
                "speech.generate",
                self.config.call_timeout,
                self.speech.generate_speech(text, voice_id),
            )
            .await
            .map_err(|e| self.reject(e, "speech", "generate_speech"))
    }

    pub async fn send_chat_message(
        &self,
        user_id: &str,
        text: &str,
        session_id: Option<&str>,
    ) -> AppResult<ChatExchange> {
        self.chat.send(user_id, text, session_id).await
    }

    /// Report a failure that has no fallback and hand it back.
    fn reject(&self, error: AppError, component: &str, action: &str) -> AppError {
        let error = error.in_component(component).during(action);
        self.handler.handle(&error);
        error
    }
}
