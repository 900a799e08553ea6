//! Collaborator trait implementations over a [`Database`].

use async_trait::async_trait;
use tracing::debug;
use vitals_core::{
    AppResult, ChatMessage, ChatSession, ChatStore, HealthMetricRecord, MetricQuery, MetricStore,
};

use crate::models::UserProfile;
use crate::user_profile::ProfileField;
use crate::{chat_message, chat_session, health_metric, user_profile, Database};

/// SQLite-backed metric and chat store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        Ok(user_profile::get_profile(self.db.pool(), user_id).await?)
    }

    pub async fn set_profile_field(
        &self,
        user_id: &str,
        field: ProfileField,
        value: Option<&str>,
    ) -> AppResult<()> {
        Ok(user_profile::set_field(self.db.pool(), user_id, field, value).await?)
    }

    pub async fn fitness_level(&self, user_id: &str) -> AppResult<Option<String>> {
        Ok(user_profile::get_fitness_level(self.db.pool(), user_id).await?)
    }
}

#[async_trait]
impl MetricStore for SqliteStore {
    async fn insert_metrics(&self, records: &[HealthMetricRecord]) -> AppResult<usize> {
        let written = health_metric::insert_metrics(self.db.pool(), records).await?;
        debug!(records = written, "Stored health metrics");
        Ok(written)
    }

    async fn list_metrics(&self, query: &MetricQuery) -> AppResult<Vec<HealthMetricRecord>> {
        Ok(health_metric::list_metrics(self.db.pool(), query).await?)
    }

    async fn count_metrics(&self, user_id: &str) -> AppResult<u64> {
        Ok(health_metric::count_metrics(self.db.pool(), user_id).await?)
    }
}

#[async_trait]
impl ChatStore for SqliteStore {
    async fn create_session(&self, session: &ChatSession) -> AppResult<()> {
        Ok(chat_session::create_session(self.db.pool(), session).await?)
    }

    async fn update_session(&self, session: &ChatSession) -> AppResult<()> {
        Ok(chat_session::update_session(self.db.pool(), session).await?)
    }

    async fn list_sessions(&self, user_id: &str) -> AppResult<Vec<ChatSession>> {
        Ok(chat_session::list_sessions(self.db.pool(), user_id).await?)
    }

    async fn get_session(&self, session_id: &str) -> AppResult<Option<ChatSession>> {
        Ok(chat_session::get_session(self.db.pool(), session_id).await?)
    }

    async fn append_messages(&self, messages: &[ChatMessage]) -> AppResult<()> {
        Ok(chat_message::append_messages(self.db.pool(), messages).await?)
    }

    async fn list_messages(&self, session_id: &str) -> AppResult<Vec<ChatMessage>> {
        Ok(chat_message::list_messages(self.db.pool(), session_id).await?)
    }
}
