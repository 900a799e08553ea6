//! Per-metric aggregates and templated insights.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vitals_core::{HealthMetricRecord, MetricType};

/// Aggregate over one metric type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub metric_type: MetricType,
    pub unit: String,
    pub count: usize,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    /// Value of the newest record.
    pub latest: f64,
    pub latest_at: DateTime<Utc>,
}

impl MetricStats {
    fn from_records(metric_type: MetricType, records: &[&HealthMetricRecord]) -> Option<Self> {
        let newest = records.iter().max_by_key(|r| r.timestamp)?;
        let sum: f64 = records.iter().map(|r| r.value).sum();
        let min = records.iter().map(|r| r.value).fold(f64::INFINITY, f64::min);
        let max = records.iter().map(|r| r.value).fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            metric_type,
            unit: metric_type.unit().to_string(),
            count: records.len(),
            average: round1(sum / records.len() as f64),
            min,
            max,
            latest: newest.value,
            latest_at: newest.timestamp,
        })
    }
}

/// Aggregates for every metric type a user has data for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    pub metrics: BTreeMap<MetricType, MetricStats>,
}

impl MetricsSummary {
    pub fn from_records(
        user_id: &str,
        records: &[HealthMetricRecord],
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut grouped: BTreeMap<MetricType, Vec<&HealthMetricRecord>> = BTreeMap::new();
        for record in records.iter().filter(|r| r.user_id == user_id) {
            grouped.entry(record.metric_type).or_default().push(record);
        }

        let metrics = grouped
            .into_iter()
            .filter_map(|(metric_type, records)| {
                MetricStats::from_records(metric_type, &records).map(|s| (metric_type, s))
            })
            .collect();

        Self {
            user_id: user_id.to_string(),
            generated_at,
            metrics,
        }
    }

    pub fn get(&self, metric_type: MetricType) -> Option<&MetricStats> {
        self.metrics.get(&metric_type)
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Tone of an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightLevel {
    Positive,
    Info,
    Warning,
}

/// A templated observation about a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub metric_type: Option<MetricType>,
    pub level: InsightLevel,
    pub title: String,
    pub message: String,
}

impl Insight {
    fn new(
        metric_type: impl Into<Option<MetricType>>,
        level: InsightLevel,
        title: &str,
        message: String,
    ) -> Self {
        Self {
            metric_type: metric_type.into(),
            level,
            title: title.to_string(),
            message,
        }
    }
}

pub const SLEEP_LOW: f64 = 70.0;
pub const SLEEP_GOOD: f64 = 85.0;
pub const STEPS_LOW: f64 = 6000.0;
pub const STEPS_GOAL: f64 = 10000.0;
pub const GLUCOSE_HIGH_AVERAGE: f64 = 140.0;
pub const GLUCOSE_SPIKE: f64 = 180.0;
pub const GLUCOSE_LOW: f64 = 70.0;
pub const HRV_LOW: f64 = 35.0;
pub const HRV_GOOD: f64 = 50.0;
pub const HEART_RATE_HIGH: f64 = 85.0;

/// Apply the fixed threshold rules to a summary.
///
/// Warnings come first, then informational notes, then positive ones.
pub fn insights(summary: &MetricsSummary) -> Vec<Insight> {
    if summary.is_empty() {
        return vec![Insight::new(
            None::<MetricType>,
            InsightLevel::Info,
            "Not enough data",
            "Connect a device or log a few days of activity to see insights.".to_string(),
        )];
    }

    let mut out = Vec::new();

    if let Some(sleep) = summary.get(MetricType::Sleep) {
        if sleep.average < SLEEP_LOW {
            out.push(Insight::new(
                MetricType::Sleep,
                InsightLevel::Warning,
                "Sleep below target",
                format!(
                    "Your average sleep score is {:.0}. A consistent bedtime can help.",
                    sleep.average
                ),
            ));
        } else if sleep.average >= SLEEP_GOOD {
            out.push(Insight::new(
                MetricType::Sleep,
                InsightLevel::Positive,
                "Restful sleep",
                format!("Your average sleep score is {:.0}. Keep it up.", sleep.average),
            ));
        }
    }

    if let Some(steps) = summary.get(MetricType::Steps) {
        if steps.average < STEPS_LOW {
            out.push(Insight::new(
                MetricType::Steps,
                InsightLevel::Warning,
                "Low activity",
                format!(
                    "You averaged {:.0} steps a day. Short walks after meals add up.",
                    steps.average
                ),
            ));
        } else if steps.average >= STEPS_GOAL {
            out.push(Insight::new(
                MetricType::Steps,
                InsightLevel::Positive,
                "Step goal reached",
                format!("You averaged {:.0} steps a day.", steps.average),
            ));
        } else {
            out.push(Insight::new(
                MetricType::Steps,
                InsightLevel::Info,
                "Close to your step goal",
                format!(
                    "You averaged {:.0} steps a day, {:.0} short of {:.0}.",
                    steps.average,
                    STEPS_GOAL - steps.average,
                    STEPS_GOAL
                ),
            ));
        }
    }

    if let Some(glucose) = summary.get(MetricType::Glucose) {
        if glucose.average > GLUCOSE_HIGH_AVERAGE {
            out.push(Insight::new(
                MetricType::Glucose,
                InsightLevel::Warning,
                "Elevated glucose",
                format!("Average glucose is {:.0} mg/dL.", glucose.average),
            ));
        }
        if glucose.max > GLUCOSE_SPIKE {
            out.push(Insight::new(
                MetricType::Glucose,
                InsightLevel::Warning,
                "Glucose spikes",
                format!(
                    "Glucose peaked at {:.0} mg/dL. Pairing carbs with protein can soften spikes.",
                    glucose.max
                ),
            ));
        }
        if glucose.min < GLUCOSE_LOW {
            out.push(Insight::new(
                MetricType::Glucose,
                InsightLevel::Warning,
                "Low glucose readings",
                format!("Glucose dipped to {:.0} mg/dL.", glucose.min),
            ));
        }
        if glucose.average <= GLUCOSE_HIGH_AVERAGE && glucose.max <= GLUCOSE_SPIKE {
            out.push(Insight::new(
                MetricType::Glucose,
                InsightLevel::Positive,
                "Stable glucose",
                format!("Average glucose is {:.0} mg/dL with no large spikes.", glucose.average),
            ));
        }
    }

    if let Some(hrv) = summary.get(MetricType::Hrv) {
        if hrv.average < HRV_LOW {
            out.push(Insight::new(
                MetricType::Hrv,
                InsightLevel::Warning,
                "Recovery is lagging",
                format!("Average HRV is {:.0} ms. Consider a lighter training day.", hrv.average),
            ));
        } else if hrv.average >= HRV_GOOD {
            out.push(Insight::new(
                MetricType::Hrv,
                InsightLevel::Positive,
                "Well recovered",
                format!("Average HRV is {:.0} ms.", hrv.average),
            ));
        }
    }

    if let Some(heart_rate) = summary.get(MetricType::HeartRate) {
        if heart_rate.average > HEART_RATE_HIGH {
            out.push(Insight::new(
                MetricType::HeartRate,
                InsightLevel::Warning,
                "Elevated heart rate",
                format!("Average heart rate is {:.0} bpm.", heart_rate.average),
            ));
        }
    }

    out.sort_by(|a, b| b.level.cmp(&a.level));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use vitals_core::MetricSource;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 8, 12, 0, 0).unwrap()
    }

    fn record(metric_type: MetricType, value: f64, hours_ago: i64) -> HealthMetricRecord {
        HealthMetricRecord::new(
            "u1",
            metric_type,
            value,
            now() - Duration::hours(hours_ago),
            MetricSource::Mock,
        )
    }

    #[test]
    fn test_stats_per_metric() {
        let records = vec![
            record(MetricType::HeartRate, 60.0, 3),
            record(MetricType::HeartRate, 80.0, 1),
            record(MetricType::HeartRate, 70.0, 2),
            record(MetricType::Steps, 9000.0, 5),
        ];
        let summary = MetricsSummary::from_records("u1", &records, now());

        let hr = summary.get(MetricType::HeartRate).unwrap();
        assert_eq!(hr.count, 3);
        assert_eq!(hr.average, 70.0);
        assert_eq!(hr.min, 60.0);
        assert_eq!(hr.max, 80.0);
        assert_eq!(hr.latest, 80.0);
        assert_eq!(hr.unit, "bpm");
        assert_eq!(summary.get(MetricType::Steps).unwrap().count, 1);
        assert!(summary.get(MetricType::Glucose).is_none());
    }

    #[test]
    fn test_other_users_ignored() {
        let mut other = record(MetricType::Sleep, 90.0, 1);
        other.user_id = "u2".to_string();
        let summary = MetricsSummary::from_records("u1", &[other], now());
        assert!(summary.is_empty());
    }

    #[test]
    fn test_empty_summary_has_info_insight() {
        let summary = MetricsSummary::from_records("u1", &[], now());
        let out = insights(&summary);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].level, InsightLevel::Info);
    }

    #[test]
    fn test_threshold_rules() {
        let records = vec![
            record(MetricType::Sleep, 62.0, 1),
            record(MetricType::Steps, 12000.0, 1),
            record(MetricType::Glucose, 120.0, 2),
            record(MetricType::Glucose, 195.0, 1),
            record(MetricType::Hrv, 55.0, 1),
        ];
        let out = insights(&MetricsSummary::from_records("u1", &records, now()));
        let titles: Vec<&str> = out.iter().map(|i| i.title.as_str()).collect();

        assert!(titles.contains(&"Sleep below target"));
        assert!(titles.contains(&"Step goal reached"));
        assert!(titles.contains(&"Glucose spikes"));
        assert!(!titles.contains(&"Stable glucose"));
        assert!(titles.contains(&"Well recovered"));
        assert_eq!(out[0].level, InsightLevel::Warning);
        assert_eq!(out.last().unwrap().level, InsightLevel::Positive);
    }
}
