//! Per-family response caches.

use std::time::Duration;

use vitals_core::{
    cache_key, CompletionReply, HealthMetricRecord, MetricQuery, NutritionAnalysis,
    NutritionRequest, RecipeFilters, RecipeSearchResults, TtlCache,
};

use crate::config::ServiceConfig;
use crate::summary::MetricsSummary;

/// Characters of the message text that take part in a chat key.
pub const CHAT_KEY_TEXT_CHARS: usize = 100;

pub const CHAT_FAMILY: &str = "chat";
pub const NUTRITION_FAMILY: &str = "nutrition";
pub const RECIPE_FAMILY: &str = "recipes";
pub const METRICS_FAMILY: &str = "metrics";
pub const SUMMARY_FAMILY: &str = "summary";

/// The service layer's caches, one typed [`TtlCache`] per call family.
///
/// Constructed once and shared; there is no global instance.
#[derive(Debug)]
pub struct CacheService {
    pub chat: TtlCache<CompletionReply>,
    pub nutrition: TtlCache<NutritionAnalysis>,
    pub recipes: TtlCache<RecipeSearchResults>,
    pub metrics: TtlCache<Vec<HealthMetricRecord>>,
    pub summaries: TtlCache<MetricsSummary>,
    chat_ttl: Duration,
    nutrition_ttl: Duration,
    recipe_ttl: Duration,
    telemetry_ttl: Duration,
}

impl CacheService {
    pub fn new(config: &ServiceConfig) -> Self {
        let max = config.cache_max_entries;
        Self {
            chat: TtlCache::with_max_entries(max),
            nutrition: TtlCache::with_max_entries(max),
            recipes: TtlCache::with_max_entries(max),
            metrics: TtlCache::with_max_entries(max),
            summaries: TtlCache::with_max_entries(max),
            chat_ttl: config.chat_ttl,
            nutrition_ttl: config.nutrition_ttl,
            recipe_ttl: config.recipe_ttl,
            telemetry_ttl: config.telemetry_ttl,
        }
    }

    pub fn chat_ttl(&self) -> Duration {
        self.chat_ttl
    }

    pub fn nutrition_ttl(&self) -> Duration {
        self.nutrition_ttl
    }

    pub fn recipe_ttl(&self) -> Duration {
        self.recipe_ttl
    }

    pub fn telemetry_ttl(&self) -> Duration {
        self.telemetry_ttl
    }

    /// Drop every cached metric read and summary for a user.
    pub async fn invalidate_user(&self, user_id: &str) -> usize {
        self.metrics.invalidate_prefix(&user_prefix(METRICS_FAMILY, user_id)).await
            + self.summaries.invalidate(&summary_key(user_id)).await as usize
    }

    /// Sweep expired entries from every family.
    pub async fn purge_expired(&self) -> usize {
        self.chat.purge_expired().await
            + self.nutrition.purge_expired().await
            + self.recipes.purge_expired().await
            + self.metrics.purge_expired().await
            + self.summaries.purge_expired().await
    }

    pub async fn clear(&self) {
        self.chat.clear().await;
        self.nutrition.clear().await;
        self.recipes.clear().await;
        self.metrics.clear().await;
        self.summaries.clear().await;
    }

    /// Resident entries across every family.
    pub async fn len(&self) -> usize {
        self.chat.len().await
            + self.nutrition.len().await
            + self.recipes.len().await
            + self.metrics.len().await
            + self.summaries.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Chat key: message text prefix, user and session.
pub fn chat_key(text: &str, user_id: &str, session_id: &str) -> String {
    let prefix: String = text.trim().chars().take(CHAT_KEY_TEXT_CHARS).collect();
    cache_key(CHAT_FAMILY, [prefix.as_str(), user_id, session_id])
}

/// Nutrition key: normalized food name, quantity and meal type.
pub fn nutrition_key(request: &NutritionRequest) -> String {
    let food = request.food.trim().to_lowercase();
    let quantity = request.quantity.trim().to_lowercase();
    let meal = request.meal_type.map_or("-", |m| m.as_str());
    cache_key(NUTRITION_FAMILY, [food.as_str(), quantity.as_str(), meal])
}

/// Recipe key: normalized query and every filter.
pub fn recipe_key(query: &str, filters: &RecipeFilters) -> String {
    let query = query.trim().to_lowercase();
    cache_key(RECIPE_FAMILY, [query, filters.fingerprint()])
}

/// Metric read key: every query field.
pub fn metrics_key(query: &MetricQuery) -> String {
    let metric = query.metric_type.map_or("-", |m| m.as_str());
    let since = query
        .since
        .map_or_else(|| "-".to_string(), |s| s.timestamp_millis().to_string());
    let limit = query.limit.map_or_else(|| "-".to_string(), |l| l.to_string());
    cache_key(METRICS_FAMILY, [query.user_id.as_str(), metric, since.as_str(), limit.as_str()])
}

pub fn summary_key(user_id: &str) -> String {
    cache_key(SUMMARY_FAMILY, [user_id])
}

/// Prefix matching every key of a family that starts with this user.
fn user_prefix(family: &str, user_id: &str) -> String {
    let mut prefix = cache_key(family, [user_id]);
    prefix.push('|');
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use vitals_core::{MealType, MetricType};

    #[test]
    fn test_chat_key_deterministic_and_scoped() {
        assert_eq!(chat_key("hello", "u1", "s1"), chat_key("hello", "u1", "s1"));
        assert_ne!(chat_key("hello", "u1", "s1"), chat_key("hello", "u2", "s1"));
        assert_ne!(chat_key("hello", "u1", "s1"), chat_key("hello", "u1", "s2"));

        let long_a = format!("{}{}", "x".repeat(100), "tail one");
        let long_b = format!("{}{}", "x".repeat(100), "tail two");
        assert_eq!(chat_key(&long_a, "u1", "s1"), chat_key(&long_b, "u1", "s1"));
    }

    #[test]
    fn test_nutrition_key_normalizes() {
        let a = NutritionRequest::new("Apple ", "150g", "u1");
        let b = NutritionRequest::new("apple", "150G", "u2");
        assert_eq!(nutrition_key(&a), nutrition_key(&b));

        let c = NutritionRequest::new("apple", "200g", "u1");
        assert_ne!(nutrition_key(&a), nutrition_key(&c));

        let d = a.clone().meal(MealType::Lunch);
        assert_ne!(nutrition_key(&a), nutrition_key(&d));
    }

    #[test]
    fn test_recipe_key_includes_filters() {
        let low = RecipeFilters {
            low_glycemic: true,
            ..RecipeFilters::default()
        };
        assert_eq!(recipe_key("Salad", &low), recipe_key("salad", &low));
        assert_ne!(recipe_key("salad", &low), recipe_key("salad", &RecipeFilters::default()));
    }

    #[test]
    fn test_metrics_key_covers_query() {
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let base = MetricQuery::for_user("u1");
        let keys = [
            metrics_key(&base),
            metrics_key(&base.clone().metric(MetricType::Sleep)),
            metrics_key(&base.clone().since(since)),
            metrics_key(&base.clone().limit(5)),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        assert!(keys[0].starts_with(&user_prefix(METRICS_FAMILY, "u1")));
        assert!(!keys[0].starts_with(&user_prefix(METRICS_FAMILY, "u")));
    }

    #[tokio::test]
    async fn test_invalidate_user_scoped() {
        let cache = CacheService::new(&ServiceConfig::default());
        let ttl = cache.telemetry_ttl();
        cache.metrics.set(&metrics_key(&MetricQuery::for_user("u1")), vec![], ttl).await;
        cache.metrics.set(&metrics_key(&MetricQuery::for_user("u10")), vec![], ttl).await;

        assert_eq!(cache.invalidate_user("u1").await, 1);
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
