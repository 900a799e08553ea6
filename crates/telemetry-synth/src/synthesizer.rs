//! Multi-day history generation.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;
use vitals_core::{HealthMetricRecord, MetricSource, MetricType};

use crate::daily;
use crate::glucose::GlucoseModel;
use crate::heart_rate;
use crate::profile::SubjectProfile;

/// Hour at which the nightly sleep score and morning HRV are recorded.
const MORNING_READING_HOUR: i64 = 7;

/// Longest history that can be generated.
pub const MAX_HISTORY_DAYS: u32 = 365;

/// How much history to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryOptions {
    /// Days of heart rate, steps, sleep and HRV, counting today.
    pub days: u32,
    /// Days of CGM readings ending at the generation time.
    pub glucose_days: u32,
    pub glucose_interval_minutes: u32,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            days: 7,
            glucose_days: 7,
            glucose_interval_minutes: 15,
        }
    }
}

impl HistoryOptions {
    /// Options for `days` of every series, capped at [`MAX_HISTORY_DAYS`].
    pub fn days(days: u32) -> Self {
        let days = days.min(MAX_HISTORY_DAYS);
        Self {
            days,
            glucose_days: days,
            ..Self::default()
        }
    }
}

/// Generates synthetic records for a user.
///
/// Timestamps are treated as wall-clock time in UTC. No record is dated after
/// the `now` passed in.
pub struct Synthesizer<R = StdRng> {
    rng: R,
    profile: SubjectProfile,
    glucose: GlucoseModel,
}

impl Synthesizer<StdRng> {
    /// Reproducible synthesizer.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl<R: Rng> Synthesizer<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            profile: SubjectProfile::default(),
            glucose: GlucoseModel::default(),
        }
    }

    pub fn with_profile(mut self, profile: SubjectProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_glucose_model(mut self, model: GlucoseModel) -> Self {
        self.glucose = model;
        self
    }

    /// Replace the subject profile used by subsequent series.
    pub fn set_profile(&mut self, profile: SubjectProfile) {
        self.profile = profile;
    }

    pub fn profile(&self) -> &SubjectProfile {
        &self.profile
    }

    pub fn glucose_model(&self) -> &GlucoseModel {
        &self.glucose
    }

    /// Hourly heart rate from 06:00 to 23:00 for each of the last `days` days.
    pub fn heart_rate_series(
        &mut self,
        user_id: &str,
        now: DateTime<Utc>,
        days: u32,
    ) -> Vec<HealthMetricRecord> {
        let today = now.date_naive();
        let mut records = Vec::new();

        for days_ago in 0..days {
            let date = today - Duration::days(days_ago as i64);
            let weekend = is_weekend(date);
            for hour in heart_rate::FIRST_HOUR..=heart_rate::LAST_HOUR {
                let timestamp = at_minute(date, hour as i64 * 60);
                if timestamp > now {
                    continue;
                }
                let value = heart_rate::sample(hour, weekend, &self.profile, &mut self.rng);
                records.push(
                    mock_record(user_id, MetricType::HeartRate, value, timestamp)
                        .with_metadata("hour", hour)
                        .with_metadata("weekend", weekend),
                );
            }
        }
        records
    }

    /// Steps, sleep score and HRV for each of the last `days` days.
    ///
    /// Steps are stamped at the day's midnight. The sleep score for the night
    /// before a day and the HRV paired with it are stamped at 07:00 that
    /// morning.
    pub fn daily_series(
        &mut self,
        user_id: &str,
        now: DateTime<Utc>,
        days: u32,
    ) -> Vec<HealthMetricRecord> {
        let today = now.date_naive();
        let mut records = Vec::new();

        for days_ago in 0..days {
            let date = today - Duration::days(days_ago as i64);
            let weekend = is_weekend(date);

            let steps = daily::steps(weekend, &mut self.rng);
            records.push(
                mock_record(user_id, MetricType::Steps, steps.steps, at_minute(date, 0))
                    .with_metadata("workout_day", steps.workout_day)
                    .with_metadata("weekend", weekend),
            );

            let morning = at_minute(date, MORNING_READING_HOUR * 60);
            if morning > now {
                continue;
            }
            let night = date - Duration::days(1);
            let night_weekend = is_weekend(night);
            let sleep = daily::sleep_score(night_weekend, days_ago, &self.profile, &mut self.rng);
            let hrv = daily::hrv(sleep, night_weekend, &mut self.rng);

            records.push(
                mock_record(user_id, MetricType::Sleep, sleep, morning)
                    .with_metadata("night_of", night.to_string()),
            );
            records.push(
                mock_record(user_id, MetricType::Hrv, hrv, morning)
                    .with_metadata("sleep_score", sleep),
            );
        }
        records
    }

    /// CGM readings on a fixed grid ending at `now` floored to the interval.
    pub fn glucose_series(
        &mut self,
        user_id: &str,
        now: DateTime<Utc>,
        options: &HistoryOptions,
    ) -> Vec<HealthMetricRecord> {
        let interval = options.glucose_interval_minutes.max(1) as i64;
        let end = floor_to_minutes(now, interval);
        let count = options.glucose_days as i64 * 24 * 60 / interval;
        let mut records = Vec::with_capacity(count as usize);

        for step in 0..count {
            let timestamp = end - Duration::minutes(step * interval);
            let minute_of_day = (timestamp.hour() * 60 + timestamp.minute()) as f64;
            let reading = self.glucose.sample(minute_of_day, &mut self.rng);

            let mut record = mock_record(user_id, MetricType::Glucose, reading.value, timestamp)
                .with_metadata("trend", reading.trend.as_str());
            if reading.exercised {
                record = record.with_metadata("exercise", true);
            }
            records.push(record);
        }
        records
    }

    /// Complete history for a user, oldest first.
    pub fn history(
        &mut self,
        user_id: &str,
        now: DateTime<Utc>,
        options: &HistoryOptions,
    ) -> Vec<HealthMetricRecord> {
        let mut records = self.heart_rate_series(user_id, now, options.days);
        records.extend(self.daily_series(user_id, now, options.days));
        records.extend(self.glucose_series(user_id, now, options));
        records.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.metric_type.as_str().cmp(b.metric_type.as_str()))
        });

        debug!(
            user_id = %user_id,
            records = records.len(),
            days = options.days,
            "Synthesized metric history"
        );
        records
    }
}

fn mock_record(
    user_id: &str,
    metric_type: MetricType,
    value: f64,
    timestamp: DateTime<Utc>,
) -> HealthMetricRecord {
    HealthMetricRecord::new(user_id, metric_type, value, timestamp, MetricSource::Mock)
        .with_metadata("synthetic", true)
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn at_minute(date: NaiveDate, minute: i64) -> DateTime<Utc> {
    Utc.from_utc_datetime(&(date.and_time(NaiveTime::MIN) + Duration::minutes(minute)))
}

fn floor_to_minutes(now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    let step = minutes * 60;
    let secs = now.timestamp();
    DateTime::from_timestamp(secs - secs.rem_euclid(step), 0).unwrap_or(now)
}
