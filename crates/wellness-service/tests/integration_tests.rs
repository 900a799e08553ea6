//! Integration tests for wellness-service.
//!
//! Everything runs in-process: mock collaborators, wiremock HTTP servers and
//! in-memory SQLite. Run with:
//!   cargo test -p wellness-service --test integration_tests

use std::sync::Arc;
use std::time::Duration;

use mock_services::{
    CannedServices, DelayedCompletion, EchoCompletion, FlakyMetricStore, InMemoryStore,
};
use serde_json::json;
use vitals_core::{
    ChatStore, CompletionService, ErrorCode, MetricQuery, MetricStore, MetricType, NutritionRequest,
    RecipeFilters, RecordingNotifier, Severity,
};
use wellness_client::{ApiConfig, WellnessApiClient, CHAT_PATH, NUTRITION_PATH};
use wellness_service::{Collaborators, DataSource, SendPhase, ServiceConfig, WellnessService};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test wiring with every collaborator replaceable.
struct Harness {
    metrics: Arc<dyn MetricStore>,
    completion: Arc<dyn CompletionService>,
    canned: Arc<CannedServices>,
    chats: Arc<InMemoryStore>,
    notifier: Arc<RecordingNotifier>,
    config: ServiceConfig,
}

impl Harness {
    fn new() -> Self {
        Self {
            metrics: Arc::new(InMemoryStore::new()),
            completion: Arc::new(EchoCompletion::new()),
            canned: Arc::new(CannedServices::new()),
            chats: Arc::new(InMemoryStore::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            config: ServiceConfig::builder().synth_seed(7).history_days(3).build(),
        }
    }

    fn metrics(mut self, store: Arc<dyn MetricStore>) -> Self {
        self.metrics = store;
        self
    }

    fn completion(mut self, completion: Arc<dyn CompletionService>) -> Self {
        self.completion = completion;
        self
    }

    fn canned(mut self, canned: CannedServices) -> Self {
        self.canned = Arc::new(canned);
        self
    }

    fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    fn build(&self) -> WellnessService {
        WellnessService::new(
            self.config.clone(),
            Collaborators {
                metrics: self.metrics.clone(),
                chats: self.chats.clone(),
                completion: self.completion.clone(),
                nutrition: self.canned.clone(),
                recipes: self.canned.clone(),
                speech: self.canned.clone(),
                notifier: Some(self.notifier.clone()),
            },
        )
    }
}

fn http_client(server: &MockServer) -> Arc<WellnessApiClient> {
    let config = ApiConfig::builder().api_url(server.uri()).build();
    Arc::new(WellnessApiClient::new(config).unwrap())
}

// ============================================================================
// Chat
// ============================================================================

mod chat_tests {
    use super::*;

    #[tokio::test]
    async fn test_chat_happy_path_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": "Test AI response", "confidence": 0.95})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let harness = Harness::new().completion(http_client(&server));
        let service = harness.build();

        let exchange = service
            .send_chat_message("u1", "How did I sleep?", None)
            .await
            .unwrap();

        assert_eq!(exchange.response, "Test AI response");
        assert_eq!(exchange.confidence, Some(0.95));
        assert!(exchange.persisted);

        let current = service.chat().current_session().unwrap();
        assert_eq!(current.last_message.as_deref(), Some("Test AI response"));
        let stored = harness.chats.list_messages(&current.id).await.unwrap();
        assert_eq!(stored.len(), 2);

        server.verify().await;
    }

    #[tokio::test]
    async fn test_rejected_send_leaves_list_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let harness = Harness::new().completion(http_client(&server));
        let service = harness.build();
        let session = service.chat().create_session("u1", "Morning").await.unwrap();
        let before = service.chat().messages(&session.id);

        let err = service
            .send_chat_message("u1", "hello", Some(session.id.as_str()))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::ApiError);
        assert_eq!(service.chat().messages(&session.id), before);
        assert_eq!(service.chat().phase(&session.id), SendPhase::RolledBack);
        assert!(harness.chats.list_messages(&session.id).await.unwrap().is_empty());
        assert_eq!(harness.notifier.notices().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_send_is_rejected_while_pending() {
        let harness = Harness::new().completion(Arc::new(DelayedCompletion::with_millis(
            EchoCompletion::new(),
            200,
        )));
        let service = harness.build();
        let session = service.chat().create_session("u1", "t").await.unwrap();

        let (first, second) = tokio::join!(
            service.send_chat_message("u1", "first", Some(session.id.as_str())),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                service
                    .send_chat_message("u1", "second", Some(session.id.as_str()))
                    .await
            }
        );

        assert_eq!(first.unwrap().response, "first");
        assert_eq!(second.unwrap_err().code(), ErrorCode::ChatBusy);

        // Accepting sends again once the first one confirmed
        assert!(service
            .send_chat_message("u1", "third", Some(session.id.as_str()))
            .await
            .is_ok());
    }
}

// ============================================================================
// Nutrition, recipes and speech
// ============================================================================

mod lookup_tests {
    use super::*;
    use wellness_client::RECIPES_PATH;

    #[tokio::test]
    async fn test_nutrition_404_rejects() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(NUTRITION_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_string("unknown food"))
            .mount(&server)
            .await;

        let client = http_client(&server);
        let harness = Harness::new();
        let service = WellnessService::new(
            harness.config.clone(),
            Collaborators {
                metrics: harness.metrics.clone(),
                chats: harness.chats.clone(),
                completion: harness.completion.clone(),
                nutrition: client.clone(),
                recipes: client.clone(),
                speech: client,
                notifier: Some(harness.notifier.clone()),
            },
        );

        let err = service
            .analyze_nutrition(&NutritionRequest::new("mystery", "1 cup", "u1"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::NutritionError);
        assert_eq!(harness.notifier.notices().len(), 1);
        assert!(service.cache().nutrition.is_empty().await);

        // Recipes share the client and the no-fallback rule
        Mock::given(method("POST"))
            .and(path(RECIPES_PATH))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        let err = service
            .search_recipes("salad", &RecipeFilters::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::RecipeError);
    }

    #[tokio::test]
    async fn test_nutrition_served_from_cache() {
        let harness = Harness::new();
        let service = harness.build();
        let request = NutritionRequest::new("Apple", "150g", "u1");

        let first = service.analyze_nutrition(&request).await.unwrap();
        let second = service
            .analyze_nutrition(&NutritionRequest::new("apple ", "150g", "u2"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.nutrition.calories, 78.0);
        assert_eq!(harness.canned.nutrition_calls(), 1);
    }

    #[tokio::test]
    async fn test_recipe_filters_are_part_of_the_key() {
        let harness = Harness::new();
        let service = harness.build();
        let capped = RecipeFilters {
            max_calories: Some(380),
            ..RecipeFilters::default()
        };

        let all = service.search_recipes("lentil", &RecipeFilters::default()).await.unwrap();
        let few = service.search_recipes("lentil", &capped).await.unwrap();
        service.search_recipes("lentil", &capped).await.unwrap();

        assert_eq!(all.recipes.len(), 3);
        assert_eq!(few.recipes.len(), 1);
        assert_eq!(harness.canned.recipe_calls(), 2);
    }

    #[tokio::test]
    async fn test_speech_failure_is_logged_only() {
        let harness = Harness::new().canned(CannedServices::failing());
        let service = harness.build();

        let err = service.generate_speech("Good morning", None).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::TtsError);
        assert_eq!(err.severity(), Severity::Low);
        assert!(harness.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_empty_food_is_validation_error() {
        let harness = Harness::new();
        let service = harness.build();
        let err = service
            .analyze_nutrition(&NutritionRequest::new("  ", "1", "u1"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(harness.canned.nutrition_calls(), 0);
    }
}

// ============================================================================
// Metrics, seeding and fallback
// ============================================================================

mod metrics_tests {
    use super::*;

    #[tokio::test]
    async fn test_first_read_seeds_then_caches() {
        let harness = Harness::new();
        let service = harness.build();
        let query = MetricQuery::for_user("u1");

        let first = service.get_metrics(&query).await.unwrap();
        assert_eq!(first.source, DataSource::Seeded);
        assert!(!first.records.is_empty());
        assert!(first.records.iter().all(|r| r.is_plausible()));

        let second = service.get_metrics(&query).await.unwrap();
        assert_eq!(second.source, DataSource::Cache);
        assert_eq!(second.records, first.records);
    }

    #[tokio::test]
    async fn test_concurrent_first_reads_seed_once() {
        let harness = Harness::new();
        let service = harness.build();
        let hr = MetricQuery::for_user("u1").metric(MetricType::HeartRate);
        let steps = MetricQuery::for_user("u1").metric(MetricType::Steps);

        let (a, b) = tokio::join!(service.get_metrics(&hr), service.get_metrics(&steps));
        let sources = [a.unwrap().source, b.unwrap().source];

        assert_eq!(sources.iter().filter(|s| **s == DataSource::Seeded).count(), 1);
        assert!(sources.contains(&DataSource::Stored));
    }

    #[tokio::test]
    async fn test_batch_partial_failure_keeps_later_chunks() {
        let store = Arc::new(FlakyMetricStore::new().failing_inserts([1]));
        let config = ServiceConfig::builder()
            .synth_seed(3)
            .history_days(7)
            .batch_chunk_size(100)
            .build();
        let harness = Harness::new().metrics(store.clone()).config(config);
        let service = harness.build();

        let report = service.seed_history("u1").await;

        assert!(report.chunks > 2);
        assert_eq!(report.failed_chunks, 1);
        assert_eq!(store.insert_calls(), report.chunks);
        assert_eq!(report.persisted, report.attempted - 100);
        assert_eq!(store.stored().len(), report.persisted);
    }

    #[tokio::test]
    async fn test_medium_store_failure_falls_back_to_synthetic() {
        let store = Arc::new(FlakyMetricStore::new().failing_reads(Severity::Medium));
        let harness = Harness::new().metrics(store.clone());
        let service = harness.build();

        let response = service
            .get_metrics(&MetricQuery::for_user("u1").metric(MetricType::Glucose).limit(10))
            .await
            .unwrap();

        assert_eq!(response.source, DataSource::Synthetic);
        assert_eq!(response.records.len(), 10);
        assert!(response.records.iter().all(|r| r.metric_type == MetricType::Glucose));
        assert!(store.stored().is_empty());
        assert!(service.cache().is_empty().await);
        assert_eq!(harness.notifier.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_high_store_failure_propagates() {
        let store = Arc::new(FlakyMetricStore::new().failing_reads(Severity::High));
        let harness = Harness::new().metrics(store);
        let service = harness.build();

        let err = service.get_metrics(&MetricQuery::for_user("u1")).await.unwrap_err();

        assert_eq!(err.severity(), Severity::High);
        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert_eq!(harness.notifier.notices().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_times_out_to_synthetic() {
        let store = Arc::new(FlakyMetricStore::new().slow_reads(Duration::from_secs(60)));
        let config = ServiceConfig::builder()
            .synth_seed(1)
            .call_timeout(Duration::from_secs(2))
            .build();
        let harness = Harness::new().metrics(store).config(config);
        let service = harness.build();

        let response = service.get_metrics(&MetricQuery::for_user("u1")).await.unwrap();

        assert_eq!(response.source, DataSource::Synthetic);
        let stats = service.timer().stats("metrics.list").await.unwrap();
        assert_eq!(stats.timeouts, 1);
    }

    #[tokio::test]
    async fn test_summary_and_insights() {
        let harness = Harness::new();
        let service = harness.build();

        let summary = service.metrics_summary("u1").await.unwrap();
        assert!(summary.get(MetricType::HeartRate).is_some());
        assert!(summary.get(MetricType::Glucose).is_some());
        for stats in summary.metrics.values() {
            assert!(stats.min <= stats.average && stats.average <= stats.max);
        }

        let cached = service.metrics_summary("u1").await.unwrap();
        assert_eq!(cached, summary);

        let insights = service.insights("u1").await.unwrap();
        assert!(!insights.is_empty());
    }

    #[tokio::test]
    async fn test_summary_refresh_leaves_metrics_cache_alone() {
        let harness = Harness::new();
        let service = harness.build();

        for _ in 0..3 {
            service.cache().summaries.clear().await;
            service.metrics_summary("u1").await.unwrap();
        }

        assert!(service.cache().metrics.is_empty().await);
        assert_eq!(service.cache().summaries.len().await, 1);
    }
}

// ============================================================================
// SQLite end to end
// ============================================================================

mod sqlite_tests {
    use super::*;
    use metric_store::{Database, SqliteStore};

    #[tokio::test]
    async fn test_seed_read_and_chat_against_sqlite() {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1).await.unwrap();
        db.migrate().await.unwrap();
        let store = Arc::new(SqliteStore::new(db));

        let service = WellnessService::new(
            ServiceConfig::builder().synth_seed(11).history_days(2).build(),
            Collaborators {
                metrics: store.clone(),
                chats: store.clone(),
                completion: Arc::new(EchoCompletion::new()),
                nutrition: Arc::new(CannedServices::new()),
                recipes: Arc::new(CannedServices::new()),
                speech: Arc::new(CannedServices::new()),
                notifier: None,
            },
        );

        let response = service
            .get_metrics(&MetricQuery::for_user("u1").metric(MetricType::Sleep))
            .await
            .unwrap();
        assert_eq!(response.source, DataSource::Seeded);
        assert!(store.count_metrics("u1").await.unwrap() > 0);

        let exchange = service.send_chat_message("u1", "hi", None).await.unwrap();
        assert!(exchange.persisted);
        let stored = store.get_session(&exchange.session.id).await.unwrap().unwrap();
        assert_eq!(stored.message_count, 2);
        assert_eq!(stored.last_message.as_deref(), Some("hi"));
    }
}
