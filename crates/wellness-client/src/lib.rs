//! HTTP client for the remote wellness services.
//!
//! [`WellnessApiClient`] implements `CompletionService`, `SpeechService`,
//! `NutritionService` and `RecipeService` from `vitals-core` over a single
//! reqwest client.
//!
//! # Example
//!
//! ```no_run
//! use wellness_client::{ApiConfig, WellnessApiClient};
//! use vitals_core::{CompletionRequest, CompletionService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WellnessApiClient::new(ApiConfig::from_env()?)?;
//!     let reply = client
//!         .complete(CompletionRequest {
//!             text: "How did I sleep?".to_string(),
//!             user_id: "user-123".to_string(),
//!             session_id: None,
//!         })
//!         .await?;
//!     println!("{}", reply.response);
//!     Ok(())
//! }
//! ```

pub mod api_types;
mod client;
mod config;

pub use client::{WellnessApiClient, CHAT_PATH, NUTRITION_PATH, RECIPES_PATH, TTS_PATH};
pub use config::{ApiConfig, ApiConfigBuilder, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
