//! Cycle outcomes, run report and pipeline errors

use chrono::{DateTime, Utc};
use rand_distr::BernoulliError;
use serde::Serialize;
use thiserror::Error;

use crate::ml_engine::TrainingError;
use crate::types::{Assessment, Diagnosis, ReadingError, Recommendation};

// ============================================================================
// Stages
// ============================================================================

/// Stages whose failure is recorded in the cycle outcome instead of
/// aborting the run
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CycleStage {
    Diagnose,
    Recommend,
}

impl CycleStage {
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Diagnose => "Diagnose",
            Self::Recommend => "Recommend",
        }
    }
}

impl std::fmt::Display for CycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A recoverable stage failure recorded in the cycle outcome
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: CycleStage,
    pub error: String,
}

// ============================================================================
// Cycle Outcome
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub assessment: Assessment,
    pub diagnosis: Option<Diagnosis>,
    pub recommendation: Option<Recommendation>,
    pub failures: Vec<StageFailure>,
}

impl CycleOutcome {
    pub const fn cycle(&self) -> u64 {
        self.assessment.reading().cycle()
    }
}

// ============================================================================
// Run Report
// ============================================================================

/// Aggregate counts over a run
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RunTotals {
    pub cycles: usize,
    /// Readings the simulator injected a fault into
    pub injected: usize,
    pub threshold_flagged: usize,
    pub confirmed: usize,
    /// Flagged by thresholds, rejected by the classifier
    pub false_alarms: usize,
    pub diagnoses: usize,
    pub recommendations: usize,
    pub failed_stages: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<CycleOutcome>,
}

impl RunReport {
    pub fn totals(&self) -> RunTotals {
        let mut t = RunTotals {
            cycles: self.outcomes.len(),
            ..RunTotals::default()
        };
        for o in &self.outcomes {
            let a = &o.assessment;
            t.injected += usize::from(a.reading().injected_fault().is_some());
            t.threshold_flagged += usize::from(a.threshold_flagged());
            t.confirmed += usize::from(a.confirmed_anomalous());
            t.false_alarms += usize::from(a.false_alarm());
            t.diagnoses += usize::from(o.diagnosis.is_some());
            t.recommendations += usize::from(o.recommendation.is_some());
            t.failed_stages += o.failures.len();
        }
        t
    }

    /// Outcomes of cycles the classifier confirmed as anomalous
    pub fn anomalies(&self) -> impl Iterator<Item = &CycleOutcome> + '_ {
        self.outcomes
            .iter()
            .filter(|o| o.assessment.confirmed_anomalous())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Fatal pipeline errors. Recoverable stage failures never appear here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Classifier training failed: {0}")]
    Training(#[from] TrainingError),

    #[error("Invalid anomaly probability: {0}")]
    Simulator(#[from] BernoulliError),

    #[error("Invalid reading: {0}")]
    Reading(#[from] ReadingError),
}
