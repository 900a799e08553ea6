//! Chat session persistence.

use sqlx::SqlitePool;
use vitals_core::ChatSession;

use crate::error::DatabaseError;
use crate::models::ChatSessionRow;
use crate::Result;

/// Insert a new session.
pub async fn create_session(pool: &SqlitePool, session: &ChatSession) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO chat_sessions (id, user_id, title, last_message, message_count, updated_at_ms)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(&session.user_id)
    .bind(&session.title)
    .bind(&session.last_message)
    .bind(session.message_count as i64)
    .bind(session.updated_at.timestamp_millis())
    .execute(pool)
    .await?;

    Ok(())
}

/// Overwrite the summary fields of an existing session.
pub async fn update_session(pool: &SqlitePool, session: &ChatSession) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE chat_sessions
        SET title = ?, last_message = ?, message_count = ?, updated_at_ms = ?
        WHERE id = ?
        "#,
    )
    .bind(&session.title)
    .bind(&session.last_message)
    .bind(session.message_count as i64)
    .bind(session.updated_at.timestamp_millis())
    .bind(&session.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "chat session",
            id: session.id.clone(),
        });
    }

    Ok(())
}

/// Get a session by id.
pub async fn get_session(pool: &SqlitePool, session_id: &str) -> Result<Option<ChatSession>> {
    let row = sqlx::query_as::<_, ChatSessionRow>(
        r#"
        SELECT id, user_id, title, last_message, message_count, updated_at_ms
        FROM chat_sessions
        WHERE id = ?
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    row.map(ChatSession::try_from).transpose()
}

/// A user's sessions, most recently updated first.
pub async fn list_sessions(pool: &SqlitePool, user_id: &str) -> Result<Vec<ChatSession>> {
    let rows = sqlx::query_as::<_, ChatSessionRow>(
        r#"
        SELECT id, user_id, title, last_message, message_count, updated_at_ms
        FROM chat_sessions
        WHERE user_id = ?
        ORDER BY updated_at_ms DESC, rowid DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ChatSession::try_from).collect()
}

/// Delete a session and its messages.
///
/// Returns true if a session was deleted, false if none existed.
pub async fn delete_session(pool: &SqlitePool, session_id: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM chat_sessions
        WHERE id = ?
        "#,
    )
    .bind(session_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
