//! Chat sessions with optimistic sends.
//!
//! A send moves its session through `Idle -> Pending -> Confirmed` or
//! `Pending -> RolledBack`. The user message is visible while the send is
//! pending and disappears again if the completion fails or the send is
//! dropped. Only one send per session may be pending at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use vitals_core::{
    AppError, AppResult, ChatMessage, ChatSession, ChatStore, CompletionReply, CompletionRequest,
    CompletionService, ErrorHandler, OperationTimer,
};

use crate::cache_service::{chat_key, CacheService};

/// Characters of the first message used as an automatic session title.
const AUTO_TITLE_CHARS: usize = 40;

/// Where a session is in its send cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendPhase {
    Idle,
    Pending,
    Confirmed,
    RolledBack,
}

impl SendPhase {
    pub fn accepts_send(&self) -> bool {
        !matches!(self, SendPhase::Pending)
    }
}

/// Result of a confirmed send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatExchange {
    pub session: ChatSession,
    pub user_message: ChatMessage,
    pub reply: ChatMessage,
    pub response: String,
    pub confidence: Option<f64>,
    /// The reply came from the chat cache.
    pub cached: bool,
    /// Both messages reached the chat store.
    pub persisted: bool,
}

#[derive(Debug)]
struct SessionState {
    session: ChatSession,
    messages: Vec<ChatMessage>,
    phase: SendPhase,
}

#[derive(Debug, Default)]
struct ChatState {
    current: Option<String>,
    sessions: HashMap<String, SessionState>,
}

fn lock(state: &Mutex<ChatState>) -> MutexGuard<'_, ChatState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Rolls the optimistic message back unless the send is confirmed.
///
/// Dropping an in-flight send future drops this guard too.
struct PendingSend<'a> {
    state: &'a Mutex<ChatState>,
    session_id: String,
    message_id: String,
    armed: bool,
}

impl PendingSend<'_> {
    fn confirm(mut self, reply: &CompletionReply) -> AppResult<(ChatSession, ChatMessage, ChatMessage)> {
        self.armed = false;
        let mut state = lock(self.state);
        let entry = state
            .sessions
            .get_mut(&self.session_id)
            .ok_or_else(|| AppError::validation("chat session closed while sending"))?;
        let user_message = entry
            .messages
            .iter()
            .find(|m| m.id == self.message_id)
            .cloned()
            .ok_or_else(|| AppError::validation("pending message vanished"))?;

        // Never older than the message it answers.
        let replied_at = reply.timestamp.max(user_message.timestamp);
        let assistant = ChatMessage::assistant(
            self.session_id.clone(),
            reply.response.clone(),
            replied_at,
            reply.detail.clone(),
        );
        entry.messages.push(assistant.clone());
        entry.session.last_message = Some(reply.response.clone());
        entry.session.message_count += 2;
        entry.session.updated_at = replied_at;
        entry.phase = SendPhase::Confirmed;

        Ok((entry.session.clone(), user_message, assistant))
    }
}

impl Drop for PendingSend<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = lock(self.state);
        if let Some(entry) = state.sessions.get_mut(&self.session_id) {
            entry.messages.retain(|m| m.id != self.message_id);
            entry.phase = SendPhase::RolledBack;
        }
        debug!(session_id = %self.session_id, "Rolled back optimistic message");
    }
}

/// Owns the current chat session and the visible message lists.
pub struct ChatSessionService {
    completion: Arc<dyn CompletionService>,
    store: Arc<dyn ChatStore>,
    cache: Arc<CacheService>,
    timer: Arc<OperationTimer>,
    handler: Arc<ErrorHandler>,
    call_timeout: Duration,
    state: Mutex<ChatState>,
}

impl ChatSessionService {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        store: Arc<dyn ChatStore>,
        cache: Arc<CacheService>,
        timer: Arc<OperationTimer>,
        handler: Arc<ErrorHandler>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            completion,
            store,
            cache,
            timer,
            handler,
            call_timeout,
            state: Mutex::new(ChatState::default()),
        }
    }

    /// Start a new session and make it current. Existing sessions are kept.
    pub async fn create_session(&self, user_id: &str, title: &str) -> AppResult<ChatSession> {
        let session = ChatSession::new(user_id, title);
        if let Err(e) = self.store.create_session(&session).await {
            let e = e.in_component("chat").during("create_session");
            self.handler.handle(&e);
            return Err(e);
        }

        let mut state = lock(&self.state);
        state.sessions.insert(
            session.id.clone(),
            SessionState {
                session: session.clone(),
                messages: Vec::new(),
                phase: SendPhase::Idle,
            },
        );
        state.current = Some(session.id.clone());
        info!(user_id = %user_id, session_id = %session.id, "Created chat session");
        Ok(session)
    }

    /// Stored sessions for a user, most recently updated first.
    pub async fn list_sessions(&self, user_id: &str) -> AppResult<Vec<ChatSession>> {
        self.store.list_sessions(user_id).await.map_err(|e| {
            let e = e.in_component("chat").during("list_sessions");
            self.handler.handle(&e);
            e
        })
    }

    /// Make a stored session current, loading its messages.
    ///
    /// A session already open keeps its in-memory list.
    pub async fn switch_session(&self, session_id: &str) -> AppResult<ChatSession> {
        {
            let mut state = lock(&self.state);
            if let Some(session) = state.sessions.get(session_id).map(|s| s.session.clone()) {
                state.current = Some(session_id.to_string());
                return Ok(session);
            }
        }

        let loaded = async {
            let session = self.store.get_session(session_id).await?.ok_or_else(|| {
                AppError::validation(format!("unknown chat session: {}", session_id))
            })?;
            let messages = self.store.list_messages(session_id).await?;
            Ok::<_, AppError>((session, messages))
        }
        .await;
        let (session, messages) = loaded.map_err(|e| {
            let e = e
                .in_component("chat")
                .during("switch_session")
                .with_context("session_id", session_id);
            self.handler.handle(&e);
            e
        })?;

        let mut state = lock(&self.state);
        let entry = state
            .sessions
            .entry(session_id.to_string())
            .or_insert(SessionState {
                session,
                messages,
                phase: SendPhase::Idle,
            });
        let session = entry.session.clone();
        state.current = Some(session_id.to_string());
        Ok(session)
    }

    pub fn current_session(&self) -> Option<ChatSession> {
        let state = lock(&self.state);
        let id = state.current.as_ref()?;
        state.sessions.get(id).map(|s| s.session.clone())
    }

    /// Snapshot of a session's visible messages.
    pub fn messages(&self, session_id: &str) -> Vec<ChatMessage> {
        lock(&self.state)
            .sessions
            .get(session_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    pub fn phase(&self, session_id: &str) -> SendPhase {
        lock(&self.state)
            .sessions
            .get(session_id)
            .map_or(SendPhase::Idle, |s| s.phase)
    }

    /// Send a message and wait for the assistant reply.
    ///
    /// Without a session id the current session is used, and a new one is
    /// created if there is none.
    pub async fn send(
        &self,
        user_id: &str,
        text: &str,
        session_id: Option<&str>,
    ) -> AppResult<ChatExchange> {
        let text = text.trim();
        if text.is_empty() {
            let e = AppError::validation("message text is empty").in_component("chat");
            self.handler.handle(&e);
            return Err(e);
        }

        let session_id = self.resolve_session(user_id, text, session_id).await?;
        let pending = self.begin(&session_id, text)?;

        let key = chat_key(text, user_id, &session_id);
        let (reply, cached) = match self.cache.chat.get(&key).await {
            Some(mut reply) => {
                // A cached reply answers this send, not the one that filled the cache.
                reply.timestamp = Utc::now();
                (reply, true)
            }
            None => {
                let computed_at = Instant::now();
                let request = CompletionRequest {
                    text: text.to_string(),
                    user_id: user_id.to_string(),
                    session_id: Some(session_id.clone()),
                };
                let result = self
                    .timer
                    .measure_with_timeout(
                        "chat.complete",
                        self.call_timeout,
                        self.completion.complete(request),
                    )
                    .await;
                match result {
                    Ok(reply) => {
                        self.cache
                            .chat
                            .set_computed_at(&key, reply.clone(), self.cache.chat_ttl(), computed_at)
                            .await;
                        (reply, false)
                    }
                    Err(e) => {
                        drop(pending);
                        let e = e
                            .in_component("chat")
                            .during("send")
                            .with_context("session_id", &session_id)
                            .with_context("service", self.completion.name());
                        self.handler.handle(&e);
                        return Err(e);
                    }
                }
            }
        };

        let (session, user_message, assistant) = pending.confirm(&reply)?;
        let persisted = self.persist(&session, &user_message, &assistant).await;

        Ok(ChatExchange {
            session,
            user_message,
            reply: assistant,
            response: reply.response,
            confidence: reply.confidence,
            cached,
            persisted,
        })
    }

    async fn resolve_session(
        &self,
        user_id: &str,
        text: &str,
        session_id: Option<&str>,
    ) -> AppResult<String> {
        match session_id {
            Some(id) => Ok(self.switch_session(id).await?.id),
            None => {
                let current = lock(&self.state).current.clone();
                match current {
                    Some(id) => Ok(id),
                    None => {
                        let title: String = text.chars().take(AUTO_TITLE_CHARS).collect();
                        Ok(self.create_session(user_id, &title).await?.id)
                    }
                }
            }
        }
    }

    /// Check and set the pending flag under one lock acquisition.
    fn begin(&self, session_id: &str, text: &str) -> AppResult<PendingSend<'_>> {
        let mut state = lock(&self.state);
        let Some(entry) = state.sessions.get_mut(session_id) else {
            return Err(AppError::validation(format!("unknown chat session: {}", session_id)));
        };
        if !entry.phase.accepts_send() {
            let e = AppError::chat_busy(session_id).in_component("chat");
            self.handler.handle(&e);
            return Err(e);
        }

        let message = ChatMessage::user(session_id, text);
        let message_id = message.id.clone();
        entry.messages.push(message);
        entry.phase = SendPhase::Pending;

        Ok(PendingSend {
            state: &self.state,
            session_id: session_id.to_string(),
            message_id,
            armed: true,
        })
    }

    /// Store a confirmed exchange. Failures are reported, not rolled back.
    async fn persist(
        &self,
        session: &ChatSession,
        user_message: &ChatMessage,
        assistant: &ChatMessage,
    ) -> bool {
        let result = async {
            self.store
                .append_messages(&[user_message.clone(), assistant.clone()])
                .await?;
            self.store.update_session(session).await
        }
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                let e = e
                    .in_component("chat")
                    .during("persist_exchange")
                    .with_context("session_id", &session.id);
                self.handler.handle(&e);
                warn!(session_id = %session.id, "Confirmed exchange was not persisted");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use mock_services::{DelayedCompletion, EchoCompletion, InMemoryStore, ScriptedCompletion};
    use vitals_core::{ChatRole, ErrorCode, RecordingNotifier, Severity};

    struct Fixture {
        chat: ChatSessionService,
        store: Arc<InMemoryStore>,
        notifier: Arc<RecordingNotifier>,
    }

    fn fixture(completion: Arc<dyn CompletionService>) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let chat = ChatSessionService::new(
            completion,
            store.clone(),
            Arc::new(CacheService::new(&ServiceConfig::default())),
            Arc::new(OperationTimer::new()),
            Arc::new(ErrorHandler::new(notifier.clone())),
            Duration::from_secs(5),
        );
        Fixture {
            chat,
            store,
            notifier,
        }
    }

    #[tokio::test]
    async fn test_send_confirms_and_persists() {
        let f = fixture(Arc::new(ScriptedCompletion::new().reply("Drink more water")));
        let session = f.chat.create_session("u1", "Hydration").await.unwrap();

        let exchange = f.chat.send("u1", "How much water?", None).await.unwrap();

        assert_eq!(exchange.response, "Drink more water");
        assert!(!exchange.cached);
        assert!(exchange.persisted);
        assert_eq!(exchange.session.id, session.id);
        assert_eq!(exchange.session.last_message.as_deref(), Some("Drink more water"));
        assert_eq!(exchange.session.message_count, 2);
        assert_eq!(f.chat.phase(&session.id), SendPhase::Confirmed);

        let roles: Vec<ChatRole> = f.chat.messages(&session.id).iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant]);
        assert_eq!(f.store.list_messages(&session.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_send_rolls_back() {
        let f = fixture(Arc::new(
            ScriptedCompletion::new()
                .reply("first")
                .fail(AppError::api("upstream 500")),
        ));
        let session = f.chat.create_session("u1", "t").await.unwrap();
        f.chat.send("u1", "hello", None).await.unwrap();
        let before = f.chat.messages(&session.id);

        let err = f.chat.send("u1", "again", None).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::ApiError);
        assert_eq!(f.chat.messages(&session.id), before);
        assert_eq!(f.chat.phase(&session.id), SendPhase::RolledBack);
        assert_eq!(f.notifier.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_send_without_session_creates_one() {
        let f = fixture(Arc::new(EchoCompletion::new()));
        assert!(f.chat.current_session().is_none());

        let exchange = f.chat.send("u1", "Plan my week of meals", None).await.unwrap();

        let current = f.chat.current_session().unwrap();
        assert_eq!(current.id, exchange.session.id);
        assert_eq!(current.title, "Plan my week of meals");
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let f = fixture(Arc::new(EchoCompletion::new()));
        let err = f.chat.send("u1", "   ", None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(f.chat.current_session().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_send_while_pending_is_busy() {
        let f = fixture(Arc::new(DelayedCompletion::with_millis(EchoCompletion::new(), 500)));
        let session = f.chat.create_session("u1", "t").await.unwrap();

        let (first, second) = tokio::join!(
            f.chat.send("u1", "one", Some(session.id.as_str())),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                assert_eq!(f.chat.phase(&session.id), SendPhase::Pending);
                f.chat.send("u1", "two", Some(session.id.as_str())).await
            }
        );

        assert!(first.is_ok());
        let err = second.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChatBusy);
        assert_eq!(err.severity(), Severity::Low);
        assert_eq!(f.chat.messages(&session.id).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_send_rolls_back() {
        let f = fixture(Arc::new(DelayedCompletion::with_secs(EchoCompletion::new(), 3)));
        let session = f.chat.create_session("u1", "t").await.unwrap();

        let outcome = tokio::time::timeout(
            Duration::from_secs(1),
            f.chat.send("u1", "never mind", Some(session.id.as_str())),
        )
        .await;

        assert!(outcome.is_err());
        assert!(f.chat.messages(&session.id).is_empty());
        assert_eq!(f.chat.phase(&session.id), SendPhase::RolledBack);
        assert!(f.chat.send("u1", "retry", None).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_rolls_back() {
        let f = fixture(Arc::new(DelayedCompletion::with_secs(EchoCompletion::new(), 30)));
        let session = f.chat.create_session("u1", "t").await.unwrap();

        let err = f.chat.send("u1", "slow", None).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.severity(), Severity::Medium);
        assert!(f.chat.messages(&session.id).is_empty());
    }

    #[tokio::test]
    async fn test_repeat_message_served_from_cache() {
        let completion = Arc::new(ScriptedCompletion::new().reply("cached answer"));
        let f = fixture(completion.clone());
        f.chat.create_session("u1", "t").await.unwrap();

        f.chat.send("u1", "same question", None).await.unwrap();
        let second = f.chat.send("u1", "same question", None).await.unwrap();

        assert!(second.cached);
        assert_eq!(second.response, "cached answer");
        assert_eq!(completion.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cached_reply_is_stamped_at_send_time() {
        let f = fixture(Arc::new(EchoCompletion::new()));
        f.chat.create_session("u1", "t").await.unwrap();

        let first = f.chat.send("u1", "same", None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = f.chat.send("u1", "same", None).await.unwrap();

        assert!(second.cached);
        assert!(second.reply.timestamp >= second.user_message.timestamp);
        assert!(second.session.updated_at >= second.user_message.timestamp);
        assert!(second.session.updated_at > first.session.updated_at);

        let messages = f.chat.messages(&second.session.id);
        assert!(messages
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[tokio::test]
    async fn test_switch_session_loads_messages_and_keeps_others() {
        let f = fixture(Arc::new(EchoCompletion::new()));
        let first = f.chat.create_session("u1", "first").await.unwrap();
        f.chat.send("u1", "hello", None).await.unwrap();
        let second = f.chat.create_session("u1", "second").await.unwrap();
        assert_eq!(f.chat.current_session().unwrap().id, second.id);

        let switched = f.chat.switch_session(&first.id).await.unwrap();
        assert_eq!(switched.id, first.id);
        assert_eq!(f.chat.messages(&first.id).len(), 2);
        assert_eq!(f.chat.list_sessions("u1").await.unwrap().len(), 2);

        let err = f.chat.switch_session("missing").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }
}
