//! Operation timing.
//!
//! [`OperationTimer`] wraps async operations and records how long they took
//! and whether they succeeded, without touching their result.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Default number of records kept before the oldest are dropped.
pub const DEFAULT_RECORD_CAPACITY: usize = 500;

/// One measured operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRecord {
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub success: bool,
    pub timed_out: bool,
}

/// Aggregate view of all records sharing an operation name.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationStats {
    pub name: String,
    pub count: usize,
    pub failures: usize,
    pub timeouts: usize,
    pub total: Duration,
    pub max: Duration,
}

impl OperationStats {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            count: 0,
            failures: 0,
            timeouts: 0,
            total: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    fn add(&mut self, record: &OperationRecord) {
        self.count += 1;
        if !record.success {
            self.failures += 1;
        }
        if record.timed_out {
            self.timeouts += 1;
        }
        self.total += record.duration;
        self.max = self.max.max(record.duration);
    }

    /// Mean latency.
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total / self.count as u32
        }
    }

    /// Fraction of failed operations in `[0, 1]`.
    pub fn error_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.failures as f64 / self.count as f64
        }
    }
}

/// Records duration and outcome of async operations.
///
/// Keeps a bounded ring of the most recent records; aggregates are computed
/// from that ring.
#[derive(Debug)]
pub struct OperationTimer {
    records: Mutex<VecDeque<OperationRecord>>,
    capacity: usize,
}

impl Default for OperationTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationTimer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RECORD_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_RECORD_CAPACITY))),
            capacity: capacity.max(1),
        }
    }

    /// Run `operation` and record its duration and outcome.
    ///
    /// The result is returned exactly as produced.
    pub async fn measure<T, E, F>(&self, name: &str, operation: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let started_at = Utc::now();
        let start = Instant::now();
        let result = operation.await;
        self.record(name, started_at, start.elapsed(), result.is_ok(), false)
            .await;
        result
    }

    /// Run `operation` with a time limit.
    ///
    /// If the limit elapses first the operation is dropped and a
    /// medium-severity `API_ERROR` is returned instead.
    pub async fn measure_with_timeout<T, F>(
        &self,
        name: &str,
        limit: Duration,
        operation: F,
    ) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let started_at = Utc::now();
        let start = Instant::now();

        match tokio::time::timeout(limit, operation).await {
            Ok(result) => {
                self.record(name, started_at, start.elapsed(), result.is_ok(), false)
                    .await;
                result
            }
            Err(_) => {
                self.record(name, started_at, start.elapsed(), false, true)
                    .await;
                Err(AppError::timeout(name, limit))
            }
        }
    }

    async fn record(
        &self,
        name: &str,
        started_at: DateTime<Utc>,
        duration: Duration,
        success: bool,
        timed_out: bool,
    ) {
        debug!(
            operation = name,
            elapsed_ms = duration.as_millis() as u64,
            success,
            timed_out,
            "Operation finished"
        );

        let mut records = self.records.lock().await;
        records.push_back(OperationRecord {
            name: name.to_string(),
            started_at,
            duration,
            success,
            timed_out,
        });
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    /// Snapshot of the retained records, oldest first.
    pub async fn records(&self) -> Vec<OperationRecord> {
        self.records.lock().await.iter().cloned().collect()
    }

    /// Aggregate for one operation name.
    pub async fn stats(&self, name: &str) -> Option<OperationStats> {
        let records = self.records.lock().await;
        let mut stats = OperationStats::new(name);
        for record in records.iter().filter(|r| r.name == name) {
            stats.add(record);
        }
        (stats.count > 0).then_some(stats)
    }

    /// Aggregates for every operation name, sorted by name.
    pub async fn summary(&self) -> Vec<OperationStats> {
        let records = self.records.lock().await;
        let mut by_name: HashMap<&str, OperationStats> = HashMap::new();
        for record in records.iter() {
            by_name
                .entry(record.name.as_str())
                .or_insert_with(|| OperationStats::new(&record.name))
                .add(record);
        }
        let mut summary: Vec<OperationStats> = by_name.into_values().collect();
        summary.sort_by(|a, b| a.name.cmp(&b.name));
        summary
    }

    pub async fn clear(&self) {
        self.records.lock().await.clear();
    }
}
