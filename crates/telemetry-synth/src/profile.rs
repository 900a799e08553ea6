//! Subject parameters.

use serde::{Deserialize, Serialize};

/// Per-user parameters that shift the structural signal.
///
/// The default profile reproduces the reference models exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectProfile {
    /// Added to the heart-rate baseline; negative for fitter subjects.
    pub fitness_offset_bpm: f64,
    /// Number of most recent nights that carry the sleep recency penalty.
    pub sleep_debt_days: u32,
}

impl Default for SubjectProfile {
    fn default() -> Self {
        Self {
            fitness_offset_bpm: 0.0,
            sleep_debt_days: 3,
        }
    }
}

impl SubjectProfile {
    /// A well-trained subject with a lower resting heart rate.
    pub fn athletic() -> Self {
        Self {
            fitness_offset_bpm: -5.0,
            ..Self::default()
        }
    }

    /// Profile for a stored fitness level. Unknown levels get the default.
    pub fn from_fitness_level(level: &str) -> Self {
        match level.trim().to_lowercase().as_str() {
            "athletic" | "athlete" => Self::athletic(),
            "sedentary" => Self::default().with_fitness_offset(5.0),
            _ => Self::default(),
        }
    }

    pub fn with_fitness_offset(mut self, bpm: f64) -> Self {
        self.fitness_offset_bpm = bpm;
        self
    }

    pub fn with_sleep_debt_days(mut self, days: u32) -> Self {
        self.sleep_debt_days = days;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fitness_level() {
        assert_eq!(SubjectProfile::from_fitness_level(" Athletic "), SubjectProfile::athletic());
        assert_eq!(SubjectProfile::from_fitness_level("sedentary").fitness_offset_bpm, 5.0);
        assert_eq!(SubjectProfile::from_fitness_level("unknown"), SubjectProfile::default());
    }
}
