//! Chat message persistence.

use sqlx::SqlitePool;
use vitals_core::ChatMessage;

use crate::models::ChatMessageRow;
use crate::Result;

/// Append messages to their sessions in one transaction, preserving order.
pub async fn append_messages(pool: &SqlitePool, messages: &[ChatMessage]) -> Result<()> {
    if messages.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for message in messages {
        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, session_id, role, text, sent_at_ms, detail)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.session_id)
        .bind(message.role.as_str())
        .bind(&message.text)
        .bind(message.timestamp.timestamp_millis())
        .bind(&message.detail)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(())
}

/// Messages of a session in the order they were appended.
pub async fn list_messages(pool: &SqlitePool, session_id: &str) -> Result<Vec<ChatMessage>> {
    let rows = sqlx::query_as::<_, ChatMessageRow>(
        r#"
        SELECT id, session_id, role, text, sent_at_ms, detail
        FROM chat_messages
        WHERE session_id = ?
        ORDER BY seq ASC
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ChatMessage::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chat_session, Database};
    use chrono::{TimeZone, Utc};
    use vitals_core::{ChatRole, ChatSession};

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1).await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_append_and_list_in_order() {
        let db = test_db().await;
        let session = ChatSession::new("u1", "Meals");
        chat_session::create_session(db.pool(), &session).await.unwrap();

        let stamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let question = ChatMessage::user(&session.id, "What should I eat?");
        let answer = ChatMessage::assistant(
            &session.id,
            "Try oatmeal.",
            stamp,
            Some("Low glycemic".to_string()),
        );
        append_messages(db.pool(), &[question.clone(), answer.clone()])
            .await
            .unwrap();

        let listed = list_messages(db.pool(), &session.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, question.id);
        assert_eq!(listed[0].role, ChatRole::User);
        assert_eq!(listed[1], answer);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected_atomically() {
        let db = test_db().await;
        let session = ChatSession::new("u1", "Dupes");
        chat_session::create_session(db.pool(), &session).await.unwrap();

        let first = ChatMessage::user(&session.id, "hi");
        append_messages(db.pool(), &[first.clone()]).await.unwrap();

        let fresh = ChatMessage::user(&session.id, "again");
        let result = append_messages(db.pool(), &[fresh, first]).await;
        assert!(result.is_err());
        assert_eq!(list_messages(db.pool(), &session.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_messages_removed_with_session() {
        let db = test_db().await;
        let session = ChatSession::new("u1", "Temp");
        chat_session::create_session(db.pool(), &session).await.unwrap();
        append_messages(db.pool(), &[ChatMessage::user(&session.id, "hello")])
            .await
            .unwrap();

        chat_session::delete_session(db.pool(), &session.id).await.unwrap();
        assert!(list_messages(db.pool(), &session.id).await.unwrap().is_empty());
    }
}
