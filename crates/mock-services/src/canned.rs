//! Fixed-answer nutrition, recipe and speech services.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use vitals_core::{
    AppError, AppResult, NutritionAnalysis, NutritionFacts, NutritionRequest, NutritionService,
    Recipe, RecipeFilters, RecipeSearchResults, RecipeService, SpeechClip, SpeechService,
};

/// Deterministic nutrition, recipe and speech answers with call counters.
#[derive(Debug, Default)]
pub struct CannedServices {
    failing: AtomicBool,
    nutrition_calls: AtomicUsize,
    recipe_calls: AtomicUsize,
    speech_calls: AtomicUsize,
}

impl CannedServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with its family's error code.
    pub fn failing() -> Self {
        let services = Self::default();
        services.set_failing(true);
        services
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn nutrition_calls(&self) -> usize {
        self.nutrition_calls.load(Ordering::SeqCst)
    }

    pub fn recipe_calls(&self) -> usize {
        self.recipe_calls.load(Ordering::SeqCst)
    }

    pub fn speech_calls(&self) -> usize {
        self.speech_calls.load(Ordering::SeqCst)
    }

    fn is_failing(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }
}

/// Rough grams from a quantity string; anything unparseable counts as 100 g.
fn grams(quantity: &str) -> f64 {
    let digits: String = quantity
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().unwrap_or(100.0)
}

#[async_trait]
impl NutritionService for CannedServices {
    async fn analyze_nutrition(&self, request: &NutritionRequest) -> AppResult<NutritionAnalysis> {
        self.nutrition_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_failing() {
            return Err(AppError::nutrition(format!("no data for {}", request.food)));
        }

        let scale = grams(&request.quantity) / 100.0;
        Ok(NutritionAnalysis {
            nutrition: NutritionFacts {
                calories: 52.0 * scale,
                protein: 0.3 * scale,
                carbohydrates: 14.0 * scale,
                fat: 0.2 * scale,
            },
            glycemic_impact: "low".to_string(),
            insights: vec![format!("{} is a reasonable choice", request.food)],
        })
    }
}

#[async_trait]
impl RecipeService for CannedServices {
    async fn search_recipes(
        &self,
        query: &str,
        filters: &RecipeFilters,
    ) -> AppResult<RecipeSearchResults> {
        self.recipe_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_failing() {
            return Err(AppError::recipe(format!("search for {} failed", query)));
        }

        let limit = filters.limit.unwrap_or(3) as usize;
        let recipes = (1..=limit)
            .map(|i| Recipe {
                id: format!("recipe-{}", i),
                title: format!("{} bowl #{}", query, i),
                summary: None,
                calories: Some(350.0 + 25.0 * i as f64),
                ready_in_minutes: Some(20),
                ingredients: vec![query.to_string()],
            })
            .filter(|r| match (filters.max_calories, r.calories) {
                (Some(max), Some(calories)) => calories <= max as f64,
                _ => true,
            })
            .collect();

        Ok(RecipeSearchResults { recipes })
    }
}

#[async_trait]
impl SpeechService for CannedServices {
    async fn generate_speech(&self, text: &str, _voice_id: Option<&str>) -> AppResult<SpeechClip> {
        self.speech_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_failing() {
            return Err(AppError::tts("speech synthesis unavailable"));
        }

        Ok(SpeechClip {
            audio_data: "UklGRg==".to_string(),
            content_type: "audio/mpeg".to_string(),
            // About 15 characters per second of speech
            duration: text.chars().count() as f64 / 15.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitals_core::ErrorCode;

    #[tokio::test]
    async fn test_nutrition_scales_with_quantity() {
        let services = CannedServices::new();
        let analysis = services
            .analyze_nutrition(&NutritionRequest::new("apple", "200g", "u1"))
            .await
            .unwrap();
        assert_eq!(analysis.nutrition.calories, 104.0);
        assert_eq!(services.nutrition_calls(), 1);
    }

    #[tokio::test]
    async fn test_recipe_filters_applied() {
        let services = CannedServices::new();
        let filters = RecipeFilters {
            max_calories: Some(380),
            limit: Some(3),
            ..RecipeFilters::default()
        };
        let results = services.search_recipes("quinoa", &filters).await.unwrap();
        assert_eq!(results.recipes.len(), 1);
        assert_eq!(results.recipes[0].title, "quinoa bowl #1");
    }

    #[tokio::test]
    async fn test_failing_uses_family_codes() {
        let services = CannedServices::failing();
        let nutrition = services
            .analyze_nutrition(&NutritionRequest::new("x", "1", "u1"))
            .await
            .unwrap_err();
        let recipes = services
            .search_recipes("x", &RecipeFilters::default())
            .await
            .unwrap_err();
        let speech = services.generate_speech("x", None).await.unwrap_err();

        assert_eq!(nutrition.code(), ErrorCode::NutritionError);
        assert_eq!(recipes.code(), ErrorCode::RecipeError);
        assert_eq!(speech.code(), ErrorCode::TtsError);
        assert_eq!(services.speech_calls(), 1);
    }
}
