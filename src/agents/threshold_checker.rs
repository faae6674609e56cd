//! Threshold Checker - first gate of every cycle
//!
//! Compares each channel of a reading against its configured `[min, max]`.
//! A reading is suspect iff at least one channel is strictly below `min` or
//! strictly above `max`; values sitting exactly on a bound pass. Pure and
//! deterministic, so it runs on every reading before anything more costly.

use crate::config::{ChannelBounds, ThresholdConfig};
use crate::types::{BoundDirection, Channel, Reading, ThresholdViolation};

/// Classify a single value against its bounds.
pub fn is_out_of_bounds(value: f64, bounds: ChannelBounds) -> Option<BoundDirection> {
    if value < bounds.min {
        Some(BoundDirection::Below)
    } else if value > bounds.max {
        Some(BoundDirection::Above)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct ThresholdChecker {
    thresholds: ThresholdConfig,
}

impl ThresholdChecker {
    pub const fn new(thresholds: ThresholdConfig) -> Self {
        Self { thresholds }
    }

    pub const fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    /// Every channel outside its bounds, in canonical channel order
    pub fn violations(&self, reading: &Reading) -> Vec<ThresholdViolation> {
        Channel::ALL
            .iter()
            .filter_map(|&channel| {
                let bounds = self.thresholds.bounds(channel);
                let value = reading.value(channel);
                is_out_of_bounds(value, bounds).map(|direction| ThresholdViolation {
                    channel,
                    value,
                    bound: match direction {
                        BoundDirection::Below => bounds.min,
                        BoundDirection::Above => bounds.max,
                    },
                    direction,
                })
            })
            .collect()
    }

    /// True iff any channel is out of bounds
    pub fn is_suspect(&self, reading: &Reading) -> bool {
        Channel::ALL.iter().any(|&channel| {
            is_out_of_bounds(reading.value(channel), self.thresholds.bounds(channel)).is_some()
        })
    }
}

impl Default for ThresholdChecker {
    fn default() -> Self {
        Self::new(ThresholdConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn reading(values: [f64; 4]) -> Reading {
        Reading::new(1, values).unwrap()
    }

    /// Uniform draw inside `[min, max]` for every channel
    fn within(rng: &mut StdRng, t: &ThresholdConfig) -> [f64; 4] {
        let mut v = [0.0; 4];
        for channel in Channel::ALL {
            let b = t.bounds(channel);
            v[channel.index()] = rng.gen_range(b.min..=b.max);
        }
        v
    }

    #[test]
    fn test_nominal_reading_passes() {
        let checker = ThresholdChecker::default();
        let r = reading([9000.0, 1900.0, 0.4, 750.0]);
        assert!(!checker.is_suspect(&r));
        assert!(checker.violations(&r).is_empty());
    }

    #[test]
    fn test_values_on_bounds_pass() {
        let checker = ThresholdChecker::default();
        assert!(!checker.is_suspect(&reading([8500.0, 1500.0, 0.0, 900.0])));
        assert!(!checker.is_suspect(&reading([9500.0, 2100.0, 1.0, 0.0])));
    }

    #[test]
    fn test_pressure_drop_flagged_below() {
        let checker = ThresholdChecker::default();
        let violations = checker.violations(&reading([9000.0, 950.0, 0.4, 750.0]));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].channel, Channel::Pressure);
        assert_eq!(violations[0].direction, BoundDirection::Below);
        assert!((violations[0].bound - 1500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_multiple_violations_in_channel_order() {
        let checker = ThresholdChecker::default();
        let violations = checker.violations(&reading([9600.0, 1900.0, 2.5, 1000.0]));
        let channels: Vec<Channel> = violations.iter().map(|v| v.channel).collect();
        assert_eq!(channels, vec![Channel::Rpm, Channel::Vibration, Channel::Egt]);
        assert!(violations.iter().all(|v| v.direction == BoundDirection::Above));
    }

    #[test]
    fn test_property_within_bounds_never_suspect() {
        let checker = ThresholdChecker::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..2_000 {
            let r = reading(within(&mut rng, checker.thresholds()));
            assert!(!checker.is_suspect(&r), "{}", r.summary_line());
        }
    }

    #[test]
    fn test_property_any_channel_outside_is_suspect() {
        let checker = ThresholdChecker::default();
        let mut rng = StdRng::seed_from_u64(12);
        for _ in 0..2_000 {
            let mut values = within(&mut rng, checker.thresholds());
            let channel = Channel::ALL[rng.gen_range(0..4)];
            let b = checker.thresholds().bounds(channel);
            let span = b.max - b.min;
            let offset = rng.gen_range(0.01..=1.0) * span;
            values[channel.index()] = if rng.gen_bool(0.5) { b.min - offset } else { b.max + offset };

            let r = reading(values);
            assert!(checker.is_suspect(&r), "{}", r.summary_line());
            assert!(checker.violations(&r).iter().any(|v| v.channel == channel));
        }
    }

    #[test]
    fn test_custom_bounds() {
        let mut t = ThresholdConfig::default();
        t.egt = ChannelBounds::new(0.0, 760.0);
        let checker = ThresholdChecker::new(t);
        assert!(checker.is_suspect(&reading([9000.0, 1900.0, 0.4, 770.0])));
    }
}
