//! Error taxonomy for the service layer.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Machine-readable error code.
///
/// The set is closed: every failure that reaches the handler carries one of
/// these codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Completion service or generic remote call failure (including timeouts).
    ApiError,
    /// Speech synthesis failure.
    TtsError,
    /// Nutrition analysis failure.
    NutritionError,
    /// Recipe search failure.
    RecipeError,
    /// Persistent store failure.
    DatabaseError,
    /// Identity provider rejected the session.
    AuthError,
    SignupError,
    SigninError,
    SignoutError,
    /// A collaborator answered with a body we could not interpret.
    InvalidResponse,
    /// A chat send was requested while another send is pending.
    ChatBusy,
    /// Caller supplied input that cannot be processed.
    ValidationError,
}

impl ErrorCode {
    /// The wire representation of this code (e.g. `API_ERROR`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ApiError => "API_ERROR",
            ErrorCode::TtsError => "TTS_ERROR",
            ErrorCode::NutritionError => "NUTRITION_ERROR",
            ErrorCode::RecipeError => "RECIPE_ERROR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::AuthError => "AUTH_ERROR",
            ErrorCode::SignupError => "SIGNUP_ERROR",
            ErrorCode::SigninError => "SIGNIN_ERROR",
            ErrorCode::SignoutError => "SIGNOUT_ERROR",
            ErrorCode::InvalidResponse => "INVALID_RESPONSE",
            ErrorCode::ChatBusy => "CHAT_BUSY",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
        }
    }

    /// Severity used by the convenience constructors on [`AppError`].
    ///
    /// Call sites that know better pass an explicit severity to
    /// [`AppError::new`].
    pub fn default_severity(&self) -> Severity {
        match self {
            ErrorCode::AuthError
            | ErrorCode::SignupError
            | ErrorCode::SigninError
            | ErrorCode::SignoutError => Severity::High,
            ErrorCode::ApiError
            | ErrorCode::NutritionError
            | ErrorCode::RecipeError
            | ErrorCode::DatabaseError
            | ErrorCode::InvalidResponse => Severity::Medium,
            ErrorCode::TtsError | ErrorCode::ChatBusy | ErrorCode::ValidationError => Severity::Low,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User impact of an error.
///
/// Ordered so that `Severity::Low < Severity::Medium < Severity::High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Logged only.
    Low,
    /// Surfaced to the user; a fallback path is permitted.
    Medium,
    /// Surfaced to the user; the operation is rejected.
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure.
///
/// Code and severity are fixed at construction; only context can be added
/// afterwards. Each instance carries a unique id so the [`ErrorHandler`]
/// can recognise an error it has already reported, clones included.
///
/// [`ErrorHandler`]: crate::ErrorHandler
#[derive(Debug, Clone, Error)]
#[error("[{code}] {message}")]
pub struct AppError {
    id: Uuid,
    code: ErrorCode,
    severity: Severity,
    message: String,
    context: BTreeMap<String, String>,
}

impl AppError {
    /// Create an error with an explicit severity.
    pub fn new(code: ErrorCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            severity,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    /// Create an error using the code's default severity.
    pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, code.default_severity(), message)
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::ApiError, message)
    }

    pub fn tts(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::TtsError, message)
    }

    pub fn nutrition(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::NutritionError, message)
    }

    pub fn recipe(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::RecipeError, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::DatabaseError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::AuthError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::InvalidResponse, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::ValidationError, message)
    }

    /// The "message already sending" condition for a chat session.
    pub fn chat_busy(session_id: &str) -> Self {
        Self::from_code(ErrorCode::ChatBusy, "message already sending")
            .with_context("session_id", session_id)
    }

    /// A network-bound operation exceeded its time limit.
    ///
    /// Timeouts are always a medium-severity `API_ERROR`, whatever the
    /// operation family.
    pub fn timeout(operation: &str, limit: Duration) -> Self {
        Self::new(
            ErrorCode::ApiError,
            Severity::Medium,
            format!("{} timed out after {}ms", operation, limit.as_millis()),
        )
        .with_context("operation", operation)
        .with_context("timeout", "true")
    }

    /// Attach a context value (component, action, correlated ids, ...).
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Shorthand for the `component` context key.
    pub fn in_component(self, component: &str) -> Self {
        self.with_context("component", component)
    }

    /// Shorthand for the `action` context key.
    pub fn during(self, action: &str) -> Self {
        self.with_context("action", action)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Whether this error was produced by a timeout.
    pub fn is_timeout(&self) -> bool {
        self.context.get("timeout").map(String::as_str) == Some("true")
    }
}

/// Result type for service-layer operations.
pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = AppError::nutrition("service returned 404");
        assert_eq!(err.to_string(), "[NUTRITION_ERROR] service returned 404");
    }

    #[test]
    fn test_default_severities() {
        assert_eq!(AppError::auth("expired").severity(), Severity::High);
        assert_eq!(AppError::api("boom").severity(), Severity::Medium);
        assert_eq!(AppError::tts("no voice").severity(), Severity::Low);
        assert_eq!(AppError::chat_busy("s1").severity(), Severity::Low);
    }

    #[test]
    fn test_explicit_severity_wins() {
        let err = AppError::new(ErrorCode::DatabaseError, Severity::High, "disk full");
        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert_eq!(err.severity(), Severity::High);
    }

    #[test]
    fn test_context_is_additive() {
        let err = AppError::database("insert failed")
            .in_component("batch_writer")
            .during("write_chunk")
            .with_context("chunk", "3");

        assert_eq!(err.context().get("component").unwrap(), "batch_writer");
        assert_eq!(err.context().get("action").unwrap(), "write_chunk");
        assert_eq!(err.context().get("chunk").unwrap(), "3");
    }

    #[test]
    fn test_timeout_is_medium_api_error() {
        let err = AppError::timeout("chat.complete", Duration::from_millis(1500));
        assert_eq!(err.code(), ErrorCode::ApiError);
        assert_eq!(err.severity(), Severity::Medium);
        assert!(err.is_timeout());
        assert!(err.message().contains("1500ms"));
    }

    #[test]
    fn test_clone_keeps_identity() {
        let err = AppError::api("boom");
        let copy = err.clone();
        assert_eq!(err.id(), copy.id());
        assert_ne!(err.id(), AppError::api("boom").id());
    }

    #[test]
    fn test_code_wire_format() {
        let json = serde_json::to_string(&ErrorCode::InvalidResponse).unwrap();
        assert_eq!(json, "\"INVALID_RESPONSE\"");
        let json = serde_json::to_string(&Severity::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }
}
