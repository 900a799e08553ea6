//! In-memory metric and chat stores.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use vitals_core::{
    AppError, AppResult, ChatMessage, ChatSession, ChatStore, ErrorCode, HealthMetricRecord,
    MetricQuery, MetricStore, Severity,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

type MetricKey = (String, &'static str, i64);

fn metric_key(record: &HealthMetricRecord) -> MetricKey {
    (
        record.user_id.clone(),
        record.metric_type.as_str(),
        record.timestamp.timestamp_millis(),
    )
}

/// Store with the same semantics as the SQLite store, kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    metrics: Mutex<BTreeMap<MetricKey, HealthMetricRecord>>,
    sessions: Mutex<HashMap<String, ChatSession>>,
    messages: Mutex<Vec<ChatMessage>>,
    insert_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `insert_metrics` calls received.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Every stored record, in key order.
    pub fn all_metrics(&self) -> Vec<HealthMetricRecord> {
        lock(&self.metrics).values().cloned().collect()
    }
}

#[async_trait]
impl MetricStore for InMemoryStore {
    async fn insert_metrics(&self, records: &[HealthMetricRecord]) -> AppResult<usize> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let mut metrics = lock(&self.metrics);
        for record in records {
            metrics.insert(metric_key(record), record.clone());
        }
        Ok(records.len())
    }

    async fn list_metrics(&self, query: &MetricQuery) -> AppResult<Vec<HealthMetricRecord>> {
        let metrics = lock(&self.metrics);
        let records: Vec<HealthMetricRecord> = metrics.values().cloned().collect();
        Ok(query.apply(&records))
    }

    async fn count_metrics(&self, user_id: &str) -> AppResult<u64> {
        let metrics = lock(&self.metrics);
        Ok(metrics.keys().filter(|(user, _, _)| user == user_id).count() as u64)
    }
}

#[async_trait]
impl ChatStore for InMemoryStore {
    async fn create_session(&self, session: &ChatSession) -> AppResult<()> {
        let mut sessions = lock(&self.sessions);
        if sessions.contains_key(&session.id) {
            return Err(AppError::database(format!("chat session already exists: {}", session.id)));
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn update_session(&self, session: &ChatSession) -> AppResult<()> {
        let mut sessions = lock(&self.sessions);
        match sessions.get_mut(&session.id) {
            Some(stored) => {
                *stored = session.clone();
                Ok(())
            }
            None => Err(AppError::database(format!("chat session not found: {}", session.id))),
        }
    }

    async fn list_sessions(&self, user_id: &str) -> AppResult<Vec<ChatSession>> {
        let mut sessions: Vec<ChatSession> = lock(&self.sessions)
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn get_session(&self, session_id: &str) -> AppResult<Option<ChatSession>> {
        Ok(lock(&self.sessions).get(session_id).cloned())
    }

    async fn append_messages(&self, messages: &[ChatMessage]) -> AppResult<()> {
        let mut stored = lock(&self.messages);
        let duplicate = messages
            .iter()
            .find(|m| stored.iter().any(|existing| existing.id == m.id));
        if let Some(message) = duplicate {
            return Err(AppError::database(format!("chat message already exists: {}", message.id)));
        }
        stored.extend(messages.iter().cloned());
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> AppResult<Vec<ChatMessage>> {
        Ok(lock(&self.messages)
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect())
    }
}

/// Metric store that fails on demand.
///
/// Insert calls are numbered from zero; calls whose number is in the failure
/// set return `DATABASE_ERROR` and store nothing. Reads can be made to fail
/// with a chosen severity or to stall.
#[derive(Debug, Default)]
pub struct FlakyMetricStore {
    inner: InMemoryStore,
    failing_inserts: HashSet<usize>,
    read_failure: Option<Severity>,
    read_delay: Option<Duration>,
    insert_calls: AtomicUsize,
    read_calls: AtomicUsize,
}

impl FlakyMetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the insert calls with these zero-based numbers.
    pub fn failing_inserts(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.failing_inserts = calls.into_iter().collect();
        self
    }

    /// Fail every read with a `DATABASE_ERROR` of this severity.
    pub fn failing_reads(mut self, severity: Severity) -> Self {
        self.read_failure = Some(severity);
        self
    }

    /// Sleep before every read.
    pub fn slow_reads(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Records that were actually stored.
    pub fn stored(&self) -> Vec<HealthMetricRecord> {
        self.inner.all_metrics()
    }

    async fn before_read(&self) -> AppResult<()> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.read_delay {
            sleep(delay).await;
        }
        match self.read_failure {
            Some(severity) => Err(AppError::new(
                ErrorCode::DatabaseError,
                severity,
                "metric store unavailable",
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MetricStore for FlakyMetricStore {
    async fn insert_metrics(&self, records: &[HealthMetricRecord]) -> AppResult<usize> {
        let call = self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_inserts.contains(&call) {
            return Err(AppError::database(format!("insert call {} rejected", call))
                .with_context("records", records.len().to_string()));
        }
        self.inner.insert_metrics(records).await
    }

    async fn list_metrics(&self, query: &MetricQuery) -> AppResult<Vec<HealthMetricRecord>> {
        self.before_read().await?;
        self.inner.list_metrics(query).await
    }

    async fn count_metrics(&self, user_id: &str) -> AppResult<u64> {
        self.before_read().await?;
        self.inner.count_metrics(user_id).await
    }
}
