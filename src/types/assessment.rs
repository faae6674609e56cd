//! Per-cycle assessment of a reading
//!
//! An `Assessment` is produced once per cycle by the coordinator and never
//! mutated afterwards. The only way to obtain a `ConfirmedAnomaly` is through
//! `Assessment::as_confirmed`, which returns `None` unless the classifier
//! confirmed the reading. Diagnosis requests accept nothing else.

use serde::{Deserialize, Serialize};

use super::reading::{Channel, Reading};

// ============================================================================
// Threshold Violations
// ============================================================================

/// Which side of a bound a value fell on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BoundDirection {
    Below,
    Above,
}

impl BoundDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Below => "below",
            Self::Above => "above",
        }
    }
}

impl std::fmt::Display for BoundDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One channel outside its configured `[min, max]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ThresholdViolation {
    pub channel: Channel,
    pub value: f64,
    /// The bound that was crossed (min when below, max when above)
    pub bound: f64,
    pub direction: BoundDirection,
}

impl ThresholdViolation {
    /// Human-readable form, e.g. `Pressure 912 PSI below minimum 1500 PSI`
    pub fn describe(&self) -> String {
        let limit = match self.direction {
            BoundDirection::Below => "minimum",
            BoundDirection::Above => "maximum",
        };
        format!(
            "{} {} {} {} {}",
            self.channel.display_name(),
            self.channel.format_value(self.value),
            self.direction,
            limit,
            self.channel.format_value(self.bound)
        )
    }
}

// ============================================================================
// Classifier Verdict
// ============================================================================

/// Output of the outlier classifier for one reading
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ClassifierVerdict {
    /// Normalized anomaly score in (0, 1]; higher is more anomalous
    pub score: f64,
    /// Fixed decision threshold of the trained model
    pub threshold: f64,
    pub confirmed: bool,
}

// ============================================================================
// Assessment
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    reading: Reading,
    violations: Vec<ThresholdViolation>,
    verdict: Option<ClassifierVerdict>,
}

impl Assessment {
    /// Assessment of a reading that passed the threshold check.
    pub const fn nominal(reading: Reading) -> Self {
        Self {
            reading,
            violations: Vec::new(),
            verdict: None,
        }
    }

    /// Assessment of a reading that was flagged and then scored.
    ///
    /// An empty violation list with a verdict is allowed but never produced by
    /// the coordinator, which only classifies flagged readings.
    pub const fn scored(
        reading: Reading,
        violations: Vec<ThresholdViolation>,
        verdict: Option<ClassifierVerdict>,
    ) -> Self {
        Self {
            reading,
            violations,
            verdict,
        }
    }

    pub const fn reading(&self) -> &Reading {
        &self.reading
    }

    pub fn violations(&self) -> &[ThresholdViolation] {
        &self.violations
    }

    pub const fn verdict(&self) -> Option<&ClassifierVerdict> {
        self.verdict.as_ref()
    }

    pub fn threshold_flagged(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Classifier score, present only when the reading was classified
    pub fn score(&self) -> Option<f64> {
        self.verdict.map(|v| v.score)
    }

    pub fn confirmed_anomalous(&self) -> bool {
        self.verdict.is_some_and(|v| v.confirmed)
    }

    /// Flagged by thresholds but rejected by the classifier
    pub fn false_alarm(&self) -> bool {
        self.threshold_flagged() && !self.confirmed_anomalous()
    }

    /// View of this assessment as a confirmed anomaly, if it is one
    pub fn as_confirmed(&self) -> Option<ConfirmedAnomaly<'_>> {
        match self.verdict {
            Some(verdict) if verdict.confirmed => Some(ConfirmedAnomaly {
                assessment: self,
                verdict,
            }),
            _ => None,
        }
    }

    /// Short status label used in the console report
    pub fn status_label(&self) -> &'static str {
        if self.confirmed_anomalous() {
            "ANOMALY"
        } else if self.threshold_flagged() {
            "FALSE ALARM"
        } else {
            "NOMINAL"
        }
    }
}

/// Borrowed view of an assessment the classifier confirmed as anomalous
#[derive(Debug, Clone, Copy)]
pub struct ConfirmedAnomaly<'a> {
    assessment: &'a Assessment,
    verdict: ClassifierVerdict,
}

impl<'a> ConfirmedAnomaly<'a> {
    pub const fn reading(&self) -> &'a Reading {
        &self.assessment.reading
    }

    pub fn violations(&self) -> &'a [ThresholdViolation] {
        &self.assessment.violations
    }

    pub const fn score(&self) -> f64 {
        self.verdict.score
    }

    pub const fn threshold(&self) -> f64 {
        self.verdict.threshold
    }

    pub const fn cycle(&self) -> u64 {
        self.assessment.reading.cycle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> Reading {
        Reading::new(1, [9000.0, 900.0, 0.4, 750.0]).unwrap()
    }

    fn violation() -> ThresholdViolation {
        ThresholdViolation {
            channel: Channel::Pressure,
            value: 900.0,
            bound: 1500.0,
            direction: BoundDirection::Below,
        }
    }

    #[test]
    fn test_nominal_has_no_confirmed_view() {
        let a = Assessment::nominal(reading());
        assert!(!a.threshold_flagged());
        assert!(a.score().is_none());
        assert!(a.as_confirmed().is_none());
        assert_eq!(a.status_label(), "NOMINAL");
    }

    #[test]
    fn test_rejected_is_false_alarm() {
        let verdict = ClassifierVerdict {
            score: 0.45,
            threshold: 0.55,
            confirmed: false,
        };
        let a = Assessment::scored(reading(), vec![violation()], Some(verdict));
        assert!(a.threshold_flagged());
        assert!(a.false_alarm());
        assert!(a.as_confirmed().is_none());
    }

    #[test]
    fn test_confirmed_view() {
        let verdict = ClassifierVerdict {
            score: 0.8,
            threshold: 0.55,
            confirmed: true,
        };
        let a = Assessment::scored(reading(), vec![violation()], Some(verdict));
        let confirmed = a.as_confirmed().unwrap();
        assert_eq!(confirmed.cycle(), 1);
        assert!((confirmed.score() - 0.8).abs() < f64::EPSILON);
        assert_eq!(confirmed.violations().len(), 1);
        assert_eq!(a.status_label(), "ANOMALY");
    }

    #[test]
    fn test_violation_description() {
        let text = violation().describe();
        assert_eq!(text, "Pressure 900 PSI below minimum 1500 PSI");
    }
}
