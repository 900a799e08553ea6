//! Once-per-day metrics: steps, sleep score and morning HRV.

use rand::Rng;
use vitals_core::MetricType;

use crate::clamp;
use crate::profile::SubjectProfile;

pub const WEEKDAY_STEPS: f64 = 9200.0;
pub const WEEKEND_STEPS: f64 = 6500.0;
pub const STEPS_VARIATION: f64 = 1500.0;
pub const WORKOUT_PROBABILITY: f64 = 0.3;
pub const WORKOUT_BONUS_STEPS: f64 = 2500.0;

pub const SLEEP_BASELINE: f64 = 78.0;
pub const SLEEP_WEEKEND_BONUS: f64 = 8.0;
pub const SLEEP_RECENCY_PENALTY: f64 = 5.0;
pub const SLEEP_NOISE: f64 = 7.5;

pub const HRV_BASELINE_MS: f64 = 42.0;
pub const HRV_GOOD_SLEEP_THRESHOLD: f64 = 85.0;
pub const HRV_GOOD_SLEEP_BONUS: f64 = 8.0;
pub const HRV_WEEKEND_BONUS: f64 = 3.0;
pub const HRV_NOISE_MS: f64 = 6.0;

/// A day's step total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepsSample {
    pub steps: f64,
    pub workout_day: bool,
}

/// Sample a daily step count (minimum 4000).
pub fn steps<R: Rng + ?Sized>(weekend: bool, rng: &mut R) -> StepsSample {
    let baseline = if weekend { WEEKEND_STEPS } else { WEEKDAY_STEPS };
    let variation = rng.gen_range(-STEPS_VARIATION..=STEPS_VARIATION);
    let workout_day = rng.gen_bool(WORKOUT_PROBABILITY);
    let bonus = if workout_day { WORKOUT_BONUS_STEPS } else { 0.0 };

    StepsSample {
        steps: clamp(baseline + variation + bonus, MetricType::Steps.plausible_range()).round(),
        workout_day,
    }
}

/// Noise-free sleep score.
///
/// `days_ago` counts nights back from the most recent one (0 = last night).
pub fn sleep_structural(weekend: bool, days_ago: u32, profile: &SubjectProfile) -> f64 {
    let mut score = SLEEP_BASELINE;
    if weekend {
        score += SLEEP_WEEKEND_BONUS;
    }
    if days_ago < profile.sleep_debt_days {
        score -= SLEEP_RECENCY_PENALTY;
    }
    score
}

/// Sample a sleep score in `[60, 95]`.
pub fn sleep_score<R: Rng + ?Sized>(
    weekend: bool,
    days_ago: u32,
    profile: &SubjectProfile,
    rng: &mut R,
) -> f64 {
    let noisy = sleep_structural(weekend, days_ago, profile) + rng.gen_range(-SLEEP_NOISE..=SLEEP_NOISE);
    clamp(noisy, MetricType::Sleep.plausible_range()).round()
}

/// Noise-free morning HRV given the night's sleep score.
pub fn hrv_structural(sleep_score: f64, weekend: bool) -> f64 {
    let mut hrv = HRV_BASELINE_MS;
    if sleep_score > HRV_GOOD_SLEEP_THRESHOLD {
        hrv += HRV_GOOD_SLEEP_BONUS;
    }
    if weekend {
        hrv += HRV_WEEKEND_BONUS;
    }
    hrv
}

/// Sample a morning HRV reading in `[25, 65]` ms.
pub fn hrv<R: Rng + ?Sized>(sleep_score: f64, weekend: bool, rng: &mut R) -> f64 {
    let noisy = hrv_structural(sleep_score, weekend) + rng.gen_range(-HRV_NOISE_MS..=HRV_NOISE_MS);
    clamp(noisy, MetricType::Hrv.plausible_range()).round()
}
