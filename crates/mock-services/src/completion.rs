//! Completion service doubles.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::sleep;
use vitals_core::{
    AppError, AppResult, CompletionReply, CompletionRequest, CompletionService, ErrorCode, Severity,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Replies with the request text.
///
/// Useful for exercising the chat flow without a remote service.
#[derive(Debug, Clone, Default)]
pub struct EchoCompletion {
    /// Optional prefix to add before the echo.
    prefix: Option<String>,
}

impl EchoCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `"<prefix><text>"`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mock_services::EchoCompletion;
    ///
    /// let completion = EchoCompletion::with_prefix("Echo: ");
    /// // Will respond with "Echo: <original text>"
    /// ```
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

#[async_trait]
impl CompletionService for EchoCompletion {
    async fn complete(&self, request: CompletionRequest) -> AppResult<CompletionReply> {
        let response = match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, request.text),
            None => request.text,
        };

        Ok(CompletionReply {
            response,
            timestamp: Utc::now(),
            confidence: Some(1.0),
            detail: None,
        })
    }

    fn name(&self) -> &str {
        "EchoCompletion"
    }
}

/// Plays back a queue of prepared outcomes and records every request.
///
/// Once the queue is empty every call fails with `API_ERROR`.
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    script: Mutex<VecDeque<AppResult<CompletionReply>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        lock(&self.script).push_back(Ok(CompletionReply {
            response: text.into(),
            timestamp: Utc::now(),
            confidence: None,
            detail: None,
        }));
        self
    }

    /// Queue a failure.
    pub fn fail(self, error: AppError) -> Self {
        lock(&self.script).push_back(Err(error));
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> AppResult<CompletionReply> {
        lock(&self.requests).push(request);
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Err(AppError::api("completion script exhausted")))
    }

    fn name(&self) -> &str {
        "ScriptedCompletion"
    }
}

/// Fails every call with a fresh error of a fixed code and severity.
#[derive(Debug, Clone)]
pub struct FailingCompletion {
    code: ErrorCode,
    severity: Severity,
    message: String,
}

impl FailingCompletion {
    pub fn new(code: ErrorCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
        }
    }

    /// A medium `API_ERROR`, the usual remote failure.
    pub fn api_error() -> Self {
        Self::new(ErrorCode::ApiError, Severity::Medium, "completion service unavailable")
    }
}

#[async_trait]
impl CompletionService for FailingCompletion {
    async fn complete(&self, _request: CompletionRequest) -> AppResult<CompletionReply> {
        Err(AppError::new(self.code, self.severity, self.message.clone()))
    }

    fn name(&self) -> &str {
        "FailingCompletion"
    }
}

/// Wraps another completion service and adds artificial delay.
///
/// Useful for holding a send in flight and for timeout handling.
pub struct DelayedCompletion<C: CompletionService> {
    inner: C,
    delay: Duration,
}

impl<C: CompletionService> DelayedCompletion<C> {
    pub fn new(inner: C, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn with_millis(inner: C, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }

    pub fn with_secs(inner: C, secs: u64) -> Self {
        Self::new(inner, Duration::from_secs(secs))
    }
}

#[async_trait]
impl<C: CompletionService> CompletionService for DelayedCompletion<C> {
    async fn complete(&self, request: CompletionRequest) -> AppResult<CompletionReply> {
        sleep(self.delay).await;
        self.inner.complete(request).await
    }

    fn name(&self) -> &str {
        "DelayedCompletion"
    }
}
