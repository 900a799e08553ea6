//! Hourly heart rate.

use rand::Rng;
use vitals_core::MetricType;

use crate::clamp;
use crate::profile::SubjectProfile;

pub const BASELINE_BPM: f64 = 62.0;
pub const NOISE_BPM: f64 = 4.0;

/// First and last hour of the day with a reading (inclusive).
pub const FIRST_HOUR: u32 = 6;
pub const LAST_HOUR: u32 = 23;

/// Additive offset for an hour of the day.
pub fn circadian_offset(hour: u32) -> f64 {
    match hour {
        // morning rise
        6..=7 => 6.0,
        // active morning
        8..=10 => 12.0,
        11 => 4.0,
        // post-lunch dip
        12..=13 => -3.0,
        // afternoon rise
        14..=17 => 8.0,
        // evening workout
        18 => 25.0,
        19..=20 => 3.0,
        // night wind-down
        21..=23 => -5.0,
        _ => -5.0,
    }
}

/// Sleeping in: lower heart rate between 08:00 and 10:00 on weekends.
pub fn weekend_offset(hour: u32, weekend: bool) -> f64 {
    if weekend && (8..10).contains(&hour) {
        -10.0
    } else {
        0.0
    }
}

/// Noise-free heart rate for an hour.
pub fn structural(hour: u32, weekend: bool, profile: &SubjectProfile) -> f64 {
    BASELINE_BPM + profile.fitness_offset_bpm + circadian_offset(hour) + weekend_offset(hour, weekend)
}

/// Sample a heart rate in bpm, clamped to the plausible range.
pub fn sample<R: Rng + ?Sized>(
    hour: u32,
    weekend: bool,
    profile: &SubjectProfile,
    rng: &mut R,
) -> f64 {
    let noisy = structural(hour, weekend, profile) + rng.gen_range(-NOISE_BPM..=NOISE_BPM);
    clamp(noisy, MetricType::HeartRate.plausible_range()).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_evening_workout_is_daily_peak() {
        let profile = SubjectProfile::default();
        let peak = (FIRST_HOUR..=LAST_HOUR)
            .max_by(|a, b| {
                structural(*a, false, &profile).total_cmp(&structural(*b, false, &profile))
            })
            .unwrap();
        assert_eq!(peak, 18);
        assert_eq!(structural(18, false, &profile), 87.0);
    }

    #[test]
    fn test_wind_down_below_baseline() {
        let profile = SubjectProfile::default();
        assert_eq!(structural(22, false, &profile), 57.0);
    }

    #[test]
    fn test_weekend_sleep_in_lowers_morning() {
        let profile = SubjectProfile::default();
        assert!(structural(9, true, &profile) < structural(9, false, &profile));
        assert_eq!(structural(10, true, &profile), structural(10, false, &profile));
        assert_eq!(structural(15, true, &profile), structural(15, false, &profile));
    }

    #[test]
    fn test_samples_stay_near_structure_and_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let profile = SubjectProfile::default();
        for hour in FIRST_HOUR..=LAST_HOUR {
            for _ in 0..200 {
                let value = sample(hour, false, &profile, &mut rng);
                assert!((55.0..=95.0).contains(&value));
                let expected = structural(hour, false, &profile).clamp(55.0, 95.0);
                assert!((value - expected).abs() <= NOISE_BPM + 0.5);
            }
        }
    }

    #[test]
    fn test_extreme_profile_still_clamped() {
        let mut rng = StdRng::seed_from_u64(1);
        let profile = SubjectProfile::default().with_fitness_offset(60.0);
        assert_eq!(sample(18, false, &profile, &mut rng), 95.0);
    }
}
