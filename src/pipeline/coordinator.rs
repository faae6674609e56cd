//! Cycle Coordinator - per-cycle stage sequence
//!
//! ```text
//! PHASE 1: Generate   (every cycle)
//! PHASE 2: Check      (every cycle, fixed per-channel bounds)
//! PHASE 3: Classify   (ONLY if the threshold check flagged the reading)
//! PHASE 4: Diagnose   (ONLY if the classifier confirmed the anomaly)
//! PHASE 5: Recommend  (ONLY if a diagnosis was produced)
//! PHASE 6: Summarize  (every cycle, then the assessment enters history)
//! ```
//!
//! Diagnose and Recommend failures are recoverable: they are logged, recorded
//! in the cycle outcome and the cycle carries on. Generation errors are fatal.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::history::History;
use super::report::{format_cycle, format_summary};
use super::state::{CycleOutcome, CycleStage, PipelineError, RunReport, StageFailure};
use crate::acquisition::TelemetrySimulator;
use crate::agents::{DiagnosisRequester, ResolutionRequester, ThresholdChecker};
use crate::config::PipelineConfig;
use crate::llm::LlmBackend;
use crate::ml_engine::{AnomalyClassifier, OutlierClassifier};
use crate::types::Assessment;

pub struct CycleCoordinator {
    /// Phase 1
    simulator: TelemetrySimulator,
    /// Phase 2
    checker: ThresholdChecker,
    /// Phase 3
    classifier: Box<dyn AnomalyClassifier>,
    /// Phase 4
    diagnosis: DiagnosisRequester,
    /// Phase 5
    resolution: ResolutionRequester,
    /// Prior assessments, read by phases 4-5
    history: History,
    num_cycles: u32,
    cycle_interval: Duration,
    /// Print cycle reports and the final summary to stdout
    console: bool,
}

impl CycleCoordinator {
    /// Train the outlier classifier and build the coordinator.
    ///
    /// Training happens here, once, before any cycle runs.
    pub fn from_config(
        config: &PipelineConfig,
        backend: Arc<dyn LlmBackend>,
    ) -> Result<Self, PipelineError> {
        info!(
            samples = config.ml_model.n_samples,
            trees = config.ml_model.n_estimators,
            contamination = config.ml_model.contamination,
            "Training outlier classifier"
        );
        let classifier = OutlierClassifier::fit(&config.ml_model)?;
        Self::with_classifier(config, backend, Box::new(classifier))
    }

    /// Build the coordinator around an already trained classifier.
    pub fn with_classifier(
        config: &PipelineConfig,
        backend: Arc<dyn LlmBackend>,
        classifier: Box<dyn AnomalyClassifier>,
    ) -> Result<Self, PipelineError> {
        let orchestrator = &config.orchestrator;
        let simulator = TelemetrySimulator::new(orchestrator.anomaly_probability, orchestrator.seed)?;

        info!(
            cycles = orchestrator.num_cycles,
            probability = orchestrator.anomaly_probability,
            classifier = classifier.name(),
            backend = backend.backend_name(),
            "Cycle coordinator ready"
        );

        Ok(Self {
            simulator,
            checker: ThresholdChecker::new(config.thresholds.clone()),
            classifier,
            diagnosis: DiagnosisRequester::from_config(config, Arc::clone(&backend)),
            resolution: ResolutionRequester::from_config(config, backend),
            history: History::new(orchestrator.history_window),
            num_cycles: orchestrator.num_cycles,
            cycle_interval: Duration::from_millis(orchestrator.cycle_interval_ms),
            console: false,
        })
    }

    /// Enable or disable stdout reporting.
    #[must_use]
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    pub const fn history(&self) -> &History {
        &self.history
    }

    pub const fn num_cycles(&self) -> u32 {
        self.num_cycles
    }

    /// Run one full cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, PipelineError> {
        // ====================================================================
        // PHASE 1: Generate
        // ====================================================================
        let reading = self.simulator.next_reading()?;
        let cycle = reading.cycle();
        debug!(cycle, injected = ?reading.injected_fault(), "Phase 1: reading generated");

        // ====================================================================
        // PHASE 2: Check
        // ====================================================================
        let violations = self.checker.violations(&reading);
        debug!(cycle, violations = violations.len(), "Phase 2: threshold check done");

        // ====================================================================
        // PHASE 3: Classify (ONLY if flagged)
        // ====================================================================
        let assessment = if violations.is_empty() {
            Assessment::nominal(reading)
        } else {
            let verdict = self.classifier.classify(&reading);
            info!(
                cycle,
                score = verdict.score,
                threshold = verdict.threshold,
                confirmed = verdict.confirmed,
                "Phase 3: suspect reading classified"
            );
            Assessment::scored(reading, violations, Some(verdict))
        };

        let mut failures = Vec::new();

        // ====================================================================
        // PHASE 4: Diagnose (ONLY if confirmed)
        // ====================================================================
        let diagnosis = match assessment.as_confirmed() {
            Some(anomaly) => {
                debug!(cycle, "Phase 4: requesting diagnosis");
                match self.diagnosis.diagnose(anomaly, &self.history).await {
                    Ok(d) => Some(d),
                    Err(e) => {
                        warn!(cycle, error = %e, "Diagnosis failed, skipping recommendation");
                        failures.push(StageFailure {
                            stage: CycleStage::Diagnose,
                            error: e.to_string(),
                        });
                        None
                    }
                }
            }
            None => None,
        };

        // ====================================================================
        // PHASE 5: Recommend (ONLY if diagnosed)
        // ====================================================================
        let recommendation = match &diagnosis {
            Some(d) => {
                debug!(cycle, "Phase 5: requesting recommendation");
                match self.resolution.recommend(d, &self.history).await {
                    Ok(r) => Some(r),
                    Err(e) => {
                        warn!(cycle, error = %e, "Recommendation failed");
                        failures.push(StageFailure {
                            stage: CycleStage::Recommend,
                            error: e.to_string(),
                        });
                        None
                    }
                }
            }
            None => None,
        };

        // ====================================================================
        // PHASE 6: Summarize
        // ====================================================================
        let outcome = CycleOutcome {
            assessment,
            diagnosis,
            recommendation,
            failures,
        };
        if self.console {
            println!("{}", format_cycle(&outcome));
        }
        self.history.push(outcome.assessment.clone());
        debug!(
            cycle,
            status = outcome.assessment.status_label(),
            history = self.history.len(),
            "Phase 6: cycle summarized"
        );

        Ok(outcome)
    }

    /// Run all configured cycles and return the run report.
    pub async fn run(&mut self) -> Result<RunReport, PipelineError> {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(self.num_cycles as usize);

        for i in 0..self.num_cycles {
            outcomes.push(self.run_cycle().await?);

            if i + 1 < self.num_cycles && !self.cycle_interval.is_zero() {
                tokio::time::sleep(self.cycle_interval).await;
            }
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        let totals = report.totals();
        info!(
            cycles = totals.cycles,
            flagged = totals.threshold_flagged,
            confirmed = totals.confirmed,
            false_alarms = totals.false_alarms,
            diagnoses = totals.diagnoses,
            recommendations = totals.recommendations,
            failed_stages = totals.failed_stages,
            "Run complete"
        );
        if self.console {
            println!("{}", format_summary(&report));
        }

        Ok(report)
    }
}
