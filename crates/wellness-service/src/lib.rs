//! Service layer for the wellness dashboard.
//!
//! [`WellnessService`] is the single entry point. It combines:
//!
//! - [`CacheService`] - Per-family TTL caches for chat, nutrition, recipes,
//!   metric reads and summaries
//! - [`BatchWriter`] - Chunked metric writes that survive a failed chunk
//! - [`ChatSessionService`] - Optimistic chat sends with rollback and a
//!   single pending send per session
//! - Seeding of empty histories and synthetic fallback from `telemetry-synth`
//! - [`MetricsSummary`] and templated [`Insight`]s
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mock_services::{CannedServices, EchoCompletion, InMemoryStore};
//! use wellness_service::{Collaborators, ServiceConfig, WellnessService};
//!
//! let store = Arc::new(InMemoryStore::new());
//! let canned = Arc::new(CannedServices::new());
//! let service = WellnessService::new(
//!     ServiceConfig::from_env()?,
//!     Collaborators {
//!         metrics: store.clone(),
//!         chats: store,
//!         completion: Arc::new(EchoCompletion::new()),
//!         nutrition: canned.clone(),
//!         recipes: canned.clone(),
//!         speech: canned,
//!         notifier: None,
//!     },
//! );
//!
//! let summary = service.metrics_summary("user-123").await?;
//! ```

mod batch;
mod cache_service;
mod chat;
mod config;
mod locks;
mod service;
mod summary;

pub use batch::{BatchReport, BatchWriter};
pub use cache_service::{
    chat_key, metrics_key, nutrition_key, recipe_key, summary_key, CacheService,
    CHAT_KEY_TEXT_CHARS,
};
pub use chat::{ChatExchange, ChatSessionService, SendPhase};
pub use config::{
    ServiceConfig, ServiceConfigBuilder, DEFAULT_BATCH_CHUNK_SIZE, DEFAULT_CHAT_TTL_SECS,
    DEFAULT_DATABASE_URL,
};
pub use locks::KeyedLocks;
pub use service::{Collaborators, DataSource, MetricsResponse, SeedOutcome, WellnessService};
pub use summary::{insights, Insight, InsightLevel, MetricStats, MetricsSummary};
