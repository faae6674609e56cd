//! Pipeline Regression Tests
//!
//! Runs the full cycle coordinator with a trained outlier classifier and a
//! static text-generation backend. Asserts on per-cycle stage gating, history
//! bounds and recoverable service failures.

use std::sync::Arc;

use telemetry_pipeline::config::PipelineConfig;
use telemetry_pipeline::llm::{RequestKind, StaticBackend};
use telemetry_pipeline::ml_engine::AnomalyClassifier;
use telemetry_pipeline::pipeline::{CycleCoordinator, CycleStage};
use telemetry_pipeline::types::{ClassifierVerdict, Reading, Severity, Urgency};

/// Deterministic, pause-free config with a smaller forest for test speed.
fn test_config(cycles: u32, probability: f64) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.orchestrator.num_cycles = cycles;
    config.orchestrator.anomaly_probability = probability;
    config.orchestrator.cycle_interval_ms = 0;
    config.orchestrator.seed = Some(42);
    config.ml_model.n_samples = 500;
    config.ml_model.n_estimators = 50;
    config.llm.max_retries = 0;
    config
}

/// Classifier that never confirms anything
struct RejectAll;

impl AnomalyClassifier for RejectAll {
    fn classify(&self, _reading: &Reading) -> ClassifierVerdict {
        ClassifierVerdict {
            score: 0.1,
            threshold: 0.6,
            confirmed: false,
        }
    }

    fn name(&self) -> &'static str {
        "reject_all"
    }
}

#[tokio::test]
async fn three_injected_cycles_produce_three_diagnoses_and_recommendations() {
    let backend = Arc::new(StaticBackend::offline());
    let config = test_config(3, 1.0);
    let mut coordinator = CycleCoordinator::from_config(&config, backend.clone()).unwrap();

    let report = coordinator.run().await.unwrap();
    let totals = report.totals();

    assert_eq!(report.outcomes.len(), 3, "one assessment per cycle");
    assert_eq!(totals.injected, 3);
    assert_eq!(totals.threshold_flagged, 3);
    assert_eq!(totals.confirmed, 3);
    assert_eq!(totals.diagnoses, 3);
    assert_eq!(totals.recommendations, 3);
    assert_eq!(totals.failed_stages, 0);
    assert_eq!(backend.call_count(), 6);

    for outcome in &report.outcomes {
        let diagnosis = outcome.diagnosis.as_ref().unwrap();
        let recommendation = outcome.recommendation.as_ref().unwrap();
        assert_eq!(diagnosis.cycle, outcome.cycle());
        assert_eq!(recommendation.cycle, outcome.cycle());
        assert_eq!(diagnosis.severity, Severity::High);
        assert_eq!(recommendation.urgency, Urgency::High);
    }
}

#[tokio::test]
async fn nominal_run_never_calls_the_service() {
    let backend = Arc::new(StaticBackend::offline());
    let mut coordinator = CycleCoordinator::from_config(&test_config(10, 0.0), backend.clone()).unwrap();

    let report = coordinator.run().await.unwrap();
    let totals = report.totals();

    assert_eq!(totals.cycles, 10);
    assert_eq!(totals.threshold_flagged, 0);
    assert_eq!(totals.diagnoses, 0);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn no_diagnosis_without_confirmation() {
    let backend = Arc::new(StaticBackend::offline());
    let mut coordinator = CycleCoordinator::with_classifier(
        &test_config(5, 1.0),
        backend.clone(),
        Box::new(RejectAll),
    )
    .unwrap();

    let report = coordinator.run().await.unwrap();
    let totals = report.totals();

    assert_eq!(totals.threshold_flagged, 5);
    assert_eq!(totals.false_alarms, 5);
    assert_eq!(totals.confirmed, 0);
    assert_eq!(totals.diagnoses, 0);
    assert_eq!(totals.recommendations, 0);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn history_stays_within_window() {
    let mut config = test_config(25, 0.3);
    config.orchestrator.history_window = 4;
    config.orchestrator.history_in_prompt = 2;
    let mut coordinator =
        CycleCoordinator::from_config(&config, Arc::new(StaticBackend::offline())).unwrap();

    for _ in 0..25 {
        coordinator.run_cycle().await.unwrap();
        assert!(coordinator.history().len() <= 4);
    }

    let cycles: Vec<u64> = coordinator
        .history()
        .iter()
        .map(|a| a.reading().cycle())
        .collect();
    assert_eq!(cycles, vec![22, 23, 24, 25]);
}

#[tokio::test]
async fn service_failure_is_recoverable() {
    let backend = Arc::new(StaticBackend::offline().with_failure(RequestKind::Diagnosis));
    let mut coordinator = CycleCoordinator::from_config(&test_config(3, 1.0), backend.clone()).unwrap();

    let report = coordinator.run().await.unwrap();
    let totals = report.totals();

    assert_eq!(totals.cycles, 3);
    assert_eq!(totals.confirmed, 3);
    assert_eq!(totals.diagnoses, 0);
    assert_eq!(totals.recommendations, 0);
    assert_eq!(totals.failed_stages, 3);
    assert!(report
        .outcomes
        .iter()
        .all(|o| o.failures.len() == 1 && o.failures[0].stage == CycleStage::Diagnose));
    // One attempt per cycle with retries disabled, no resolution requests
    assert_eq!(backend.call_count(), 3);
}

#[tokio::test]
async fn malformed_reply_is_recoverable() {
    let backend = Arc::new(
        StaticBackend::offline().with_response(RequestKind::Resolution, "Sorry, I cannot help."),
    );
    let mut coordinator = CycleCoordinator::from_config(&test_config(2, 1.0), backend).unwrap();

    let report = coordinator.run().await.unwrap();
    let totals = report.totals();

    assert_eq!(totals.diagnoses, 2);
    assert_eq!(totals.recommendations, 0);
    assert!(report
        .outcomes
        .iter()
        .all(|o| o.failures.iter().any(|f| f.stage == CycleStage::Recommend)));
}

#[tokio::test]
async fn same_seed_same_run() {
    let run = || async {
        let mut coordinator = CycleCoordinator::from_config(
            &test_config(12, 0.4),
            Arc::new(StaticBackend::offline()),
        )
        .unwrap();
        let report = coordinator.run().await.unwrap();
        report
            .outcomes
            .iter()
            .map(|o| (o.assessment.reading().features(), o.assessment.score()))
            .collect::<Vec<_>>()
    };

    assert_eq!(run().await, run().await);
}
