//! Continuous glucose readings.
//!
//! The structural signal is a baseline, a half-sine dawn rise between 04:00
//! and 08:00, and one exponentially decaying response per meal. Meal
//! parameters are empirical, so they live in [`GlucoseModel`] rather than in
//! constants.

use std::f64::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};
use vitals_core::MetricType;

use crate::clamp;

/// Glucose above this is labelled rising.
pub const RISING_ABOVE: f64 = 140.0;
/// Glucose below this is labelled falling.
pub const FALLING_BELOW: f64 = 85.0;

/// One meal's glucose response: `intensity * exp(-minutes_since / decay_minutes)`
/// while `minutes_since` lies in `[0, window_minutes]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSpike {
    pub name: String,
    /// Meal time as minutes after midnight.
    pub minute_of_day: u32,
    pub window_minutes: u32,
    pub intensity: f64,
    pub decay_minutes: f64,
}

impl MealSpike {
    pub fn new(
        name: impl Into<String>,
        hour: u32,
        window_minutes: u32,
        intensity: f64,
        decay_minutes: f64,
    ) -> Self {
        Self {
            name: name.into(),
            minute_of_day: hour * 60,
            window_minutes,
            intensity,
            decay_minutes,
        }
    }

    /// Contribution of this meal at a minute of the day.
    pub fn response(&self, minute_of_day: f64) -> f64 {
        let since = minute_of_day - self.minute_of_day as f64;
        if since < 0.0 || since > self.window_minutes as f64 {
            return 0.0;
        }
        self.intensity * (-since / self.decay_minutes).exp()
    }
}

/// Parameters of the glucose model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseModel {
    pub baseline: f64,
    pub dawn_amplitude: f64,
    pub dawn_start_hour: f64,
    pub dawn_end_hour: f64,
    pub meals: Vec<MealSpike>,
    pub exercise_dip: f64,
    pub exercise_probability: f64,
    pub exercise_start_hour: u32,
    pub exercise_end_hour: u32,
    pub noise: f64,
}

impl Default for GlucoseModel {
    fn default() -> Self {
        Self {
            baseline: 98.0,
            dawn_amplitude: 15.0,
            dawn_start_hour: 4.0,
            dawn_end_hour: 8.0,
            // Later meals clear more slowly (insulin resistance).
            meals: vec![
                MealSpike::new("breakfast", 7, 180, 65.0, 90.0),
                MealSpike::new("lunch", 12, 210, 75.0, 100.0),
                MealSpike::new("dinner", 19, 240, 70.0, 110.0),
            ],
            exercise_dip: 20.0,
            exercise_probability: 0.4,
            exercise_start_hour: 17,
            exercise_end_hour: 19,
            noise: 6.0,
        }
    }
}

impl GlucoseModel {
    /// Dawn phenomenon offset at a minute of the day.
    pub fn dawn_offset(&self, minute_of_day: f64) -> f64 {
        let hour = minute_of_day / 60.0;
        if hour < self.dawn_start_hour || hour >= self.dawn_end_hour {
            return 0.0;
        }
        let phase = (hour - self.dawn_start_hour) / (self.dawn_end_hour - self.dawn_start_hour);
        self.dawn_amplitude * (PI * phase).sin()
    }

    /// Sum of active meal responses at a minute of the day.
    pub fn meal_offset(&self, minute_of_day: f64) -> f64 {
        self.meals.iter().map(|meal| meal.response(minute_of_day)).sum()
    }

    /// Whether any meal window is active.
    pub fn in_meal_window(&self, minute_of_day: f64) -> bool {
        self.meals.iter().any(|meal| {
            let since = minute_of_day - meal.minute_of_day as f64;
            since >= 0.0 && since <= meal.window_minutes as f64
        })
    }

    fn in_exercise_window(&self, minute_of_day: f64) -> bool {
        let hour = minute_of_day / 60.0;
        hour >= self.exercise_start_hour as f64 && hour < self.exercise_end_hour as f64
    }

    /// Noise-free glucose at a minute of the day.
    pub fn structural(&self, minute_of_day: f64) -> f64 {
        self.baseline + self.dawn_offset(minute_of_day) + self.meal_offset(minute_of_day)
    }

    /// Sample a reading at a minute of the day.
    pub fn sample<R: Rng + ?Sized>(&self, minute_of_day: f64, rng: &mut R) -> GlucoseReading {
        let mut value = self.structural(minute_of_day);
        let exercised =
            self.in_exercise_window(minute_of_day) && rng.gen_bool(self.exercise_probability);
        if exercised {
            value -= self.exercise_dip;
        }
        value += rng.gen_range(-self.noise..=self.noise);

        let value = clamp(value, MetricType::Glucose.plausible_range());
        let value = (value * 10.0).round() / 10.0;

        GlucoseReading {
            value,
            trend: GlucoseTrend::from_value(value),
            exercised,
        }
    }
}

/// Direction label derived from a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlucoseTrend {
    Rising,
    Falling,
    Stable,
}

impl GlucoseTrend {
    pub fn from_value(value: f64) -> Self {
        if value > RISING_ABOVE {
            GlucoseTrend::Rising
        } else if value < FALLING_BELOW {
            GlucoseTrend::Falling
        } else {
            GlucoseTrend::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GlucoseTrend::Rising => "rising",
            GlucoseTrend::Falling => "falling",
            GlucoseTrend::Stable => "stable",
        }
    }
}

/// A sampled glucose value with its trend label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlucoseReading {
    pub value: f64,
    pub trend: GlucoseTrend,
    pub exercised: bool,
}
