//! Synthetic physiological telemetry.
//!
//! Every model follows the same rule: a deterministic structural signal
//! (time of day, weekday/weekend, recency) plus bounded uniform noise,
//! followed by a hard clamp to the metric's plausible range. The clamp is
//! always applied after the noise, so no seed can produce an implausible
//! value.
//!
//! - [`heart_rate`] - Hourly heart rate with a circadian curve
//! - [`daily`] - Daily steps, sleep score and morning HRV
//! - [`glucose`] - 15-minute CGM readings with dawn rise and meal responses
//! - [`Synthesizer`] - Multi-day history generation for a user
//!
//! All sampling functions take an explicit RNG, so a seeded
//! [`rand::rngs::StdRng`] makes every series reproducible.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use telemetry_synth::{HistoryOptions, Synthesizer};
//!
//! let mut synth = Synthesizer::seeded(42);
//! let records = synth.history("user-123", Utc::now(), &HistoryOptions::default());
//!
//! assert!(records.iter().all(|r| r.is_plausible()));
//! ```

pub mod daily;
pub mod glucose;
pub mod heart_rate;
mod profile;
mod synthesizer;

pub use glucose::{GlucoseModel, GlucoseReading, GlucoseTrend, MealSpike};
pub use profile::SubjectProfile;
pub use synthesizer::{HistoryOptions, Synthesizer, MAX_HISTORY_DAYS};

/// Apply the hard clamp for a metric range.
pub(crate) fn clamp(value: f64, (min, max): (f64, f64)) -> f64 {
    value.clamp(min, max)
}
