//! Health metric persistence.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use vitals_core::{HealthMetricRecord, MetricQuery};

use crate::error::DatabaseError;
use crate::models::HealthMetricRow;
use crate::Result;

/// Insert records in one transaction.
///
/// Rows are keyed by `(user_id, metric_type, recorded_at_ms)`; a repeated key
/// overwrites the stored value, so re-running a write is harmless. Either
/// every record is stored or none is.
pub async fn insert_metrics(pool: &SqlitePool, records: &[HealthMetricRecord]) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for record in records {
        let metadata = serde_json::to_string(&record.metadata).map_err(|e| {
            DatabaseError::Corrupt {
                entity: "health metric",
                reason: e.to_string(),
            }
        })?;

        sqlx::query(
            r#"
            INSERT INTO health_metrics
                (user_id, metric_type, value, unit, recorded_at_ms, source, metadata)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, metric_type, recorded_at_ms) DO UPDATE SET
                value = excluded.value,
                unit = excluded.unit,
                source = excluded.source,
                metadata = excluded.metadata
            "#,
        )
        .bind(&record.user_id)
        .bind(record.metric_type.as_str())
        .bind(record.value)
        .bind(&record.unit)
        .bind(record.timestamp.timestamp_millis())
        .bind(record.source.as_str())
        .bind(metadata)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(records.len())
}

/// List metrics matching a query, newest first.
pub async fn list_metrics(pool: &SqlitePool, query: &MetricQuery) -> Result<Vec<HealthMetricRecord>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, user_id, metric_type, value, unit, recorded_at_ms, source, metadata \
         FROM health_metrics WHERE user_id = ",
    );
    builder.push_bind(&query.user_id);

    if let Some(metric_type) = query.metric_type {
        builder.push(" AND metric_type = ");
        builder.push_bind(metric_type.as_str());
    }
    if let Some(since) = query.since {
        builder.push(" AND recorded_at_ms >= ");
        builder.push_bind(since.timestamp_millis());
    }
    builder.push(" ORDER BY recorded_at_ms DESC, id DESC");
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit as i64);
    }

    let rows = builder
        .build_query_as::<HealthMetricRow>()
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(HealthMetricRecord::try_from).collect()
}

/// Number of stored records for a user.
pub async fn count_metrics(pool: &SqlitePool, user_id: &str) -> Result<u64> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM health_metrics
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count.max(0) as u64)
}
