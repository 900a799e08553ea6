//! In-memory collaborators for testing the Vitals service layer.
//!
//! - [`EchoCompletion`] - Echoes the request text back
//! - [`ScriptedCompletion`] - Plays back prepared replies and failures
//! - [`FailingCompletion`] - Always fails with a chosen code and severity
//! - [`DelayedCompletion`] - Wraps another completion service with a delay
//! - [`CannedServices`] - Fixed nutrition, recipe and speech answers
//! - [`InMemoryStore`] - `MetricStore` and `ChatStore` backed by memory
//! - [`FlakyMetricStore`] - Metric store with scripted failures
//!
//! For production use, see the `wellness-client` and `metric-store` crates.
//!
//! # Example
//!
//! ```rust
//! use mock_services::EchoCompletion;
//! use vitals_core::{CompletionRequest, CompletionService};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), vitals_core::AppError> {
//!     let completion = EchoCompletion::new();
//!     let reply = completion
//!         .complete(CompletionRequest {
//!             text: "Hello!".to_string(),
//!             user_id: "user-123".to_string(),
//!             session_id: None,
//!         })
//!         .await?;
//!     assert_eq!(reply.response, "Hello!");
//!     Ok(())
//! }
//! ```

mod canned;
mod completion;
mod store;

pub use canned::CannedServices;
pub use completion::{DelayedCompletion, EchoCompletion, FailingCompletion, ScriptedCompletion};
pub use store::{FlakyMetricStore, InMemoryStore};
