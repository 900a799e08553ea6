//! Core types and primitives for the Vitals service layer.
//!
//! This crate provides the shared vocabulary used by every other crate in
//! the workspace:
//!
//! - [`AppError`] / [`ErrorCode`] / [`Severity`] - The closed error taxonomy
//! - [`ErrorHandler`] - Severity-driven dispatcher with idempotent reporting
//! - [`TtlCache`] - Bounded key/value cache with per-entry expiry
//! - [`OperationTimer`] - Latency and outcome recorder for async operations
//! - [`config`] - Environment parsing helpers and [`ConfigError`]
//! - Domain models ([`HealthMetricRecord`], [`ChatMessage`], [`ChatSession`], ...)
//! - Collaborator traits ([`CompletionService`], [`MetricStore`], [`ChatStore`], ...)
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use vitals_core::{cache_key, TtlCache};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let cache = TtlCache::new();
//!     let key = cache_key("nutrition", ["apple", "150g"]);
//!
//!     cache.set(&key, 95.0_f64, Duration::from_secs(900)).await;
//!     assert_eq!(cache.get(&key).await, Some(95.0));
//! }
//! ```

mod cache;
pub mod config;
mod error;
mod handler;
mod models;
mod services;
mod timer;

pub use cache::{cache_key, TtlCache, DEFAULT_MAX_ENTRIES};
pub use config::ConfigError;
pub use error::{AppError, AppResult, ErrorCode, Severity};
pub use handler::{ErrorHandler, HandlingOutcome, LoggingNotifier, Notice, Notifier, RecordingNotifier};
pub use models::{
    ChatMessage, ChatRole, ChatSession, CompletionReply, CompletionRequest, HealthMetricRecord,
    MealType, MetricQuery, MetricSource, MetricType, NutritionAnalysis, NutritionFacts,
    NutritionRequest, ParseEnumError, Recipe, RecipeFilters, RecipeSearchResults, SpeechClip,
};
pub use services::{
    ChatStore, CompletionService, MetricStore, NutritionService, RecipeService, SpeechService,
};
pub use timer::{OperationRecord, OperationStats, OperationTimer, DEFAULT_RECORD_CAPACITY};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
