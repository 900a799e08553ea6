//! Chunked, failure-tolerant metric writes.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};
use vitals_core::{HealthMetricRecord, MetricStore};

use crate::locks::KeyedLocks;

/// Outcome of one [`BatchWriter::write`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Records handed to the writer.
    pub attempted: usize,
    /// Records the store confirmed.
    pub persisted: usize,
    pub chunks: usize,
    pub failed_chunks: usize,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed_chunks == 0 && self.persisted == self.attempted
    }
}

/// Persists records in fixed-size chunks.
///
/// A chunk that fails is logged and skipped; later chunks are still
/// attempted, so a write is best effort rather than a transaction. Writes
/// for the same user are serialized; different users proceed concurrently.
pub struct BatchWriter {
    store: Arc<dyn MetricStore>,
    chunk_size: usize,
    locks: KeyedLocks,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn MetricStore>, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
            locks: KeyedLocks::new(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Write `records`, returning how many were persisted.
    pub async fn write(&self, records: &[HealthMetricRecord]) -> BatchReport {
        let mut by_user: IndexMap<&str, Vec<HealthMetricRecord>> = IndexMap::new();
        for record in records {
            by_user
                .entry(record.user_id.as_str())
                .or_default()
                .push(record.clone());
        }

        let mut report = BatchReport {
            attempted: records.len(),
            ..BatchReport::default()
        };
        for (user_id, user_records) in by_user {
            let partial = self.write_partition(user_id, &user_records).await;
            report.persisted += partial.persisted;
            report.chunks += partial.chunks;
            report.failed_chunks += partial.failed_chunks;
        }

        debug!(
            attempted = report.attempted,
            persisted = report.persisted,
            failed_chunks = report.failed_chunks,
            "Batch write finished"
        );
        report
    }

    async fn write_partition(&self, user_id: &str, records: &[HealthMetricRecord]) -> BatchReport {
        let _guard = self.locks.lock(user_id).await;
        let mut report = BatchReport {
            attempted: records.len(),
            ..BatchReport::default()
        };

        for (index, chunk) in records.chunks(self.chunk_size).enumerate() {
            report.chunks += 1;
            match self.store.insert_metrics(chunk).await {
                Ok(_) => report.persisted += chunk.len(),
                Err(e) => {
                    report.failed_chunks += 1;
                    warn!(
                        user_id = %user_id,
                        chunk = index,
                        records = chunk.len(),
                        code = %e.code(),
                        "Skipping failed chunk: {}",
                        e.message()
                    );
                }
            }
        }
        report
    }
}
