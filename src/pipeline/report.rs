//! Console report formatting
//!
//! Human-readable text only; the layout is not a stable format.

use std::fmt::Write;

use super::state::{CycleOutcome, RunReport};

const RULE_WIDTH: usize = 70;

/// Report block for one cycle
pub fn format_cycle(outcome: &CycleOutcome) -> String {
    let a = &outcome.assessment;
    let reading = a.reading();
    let mut out = String::new();

    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
    let _ = writeln!(
        out,
        "Cycle {} [{}]  {}",
        reading.cycle(),
        a.status_label(),
        reading.timestamp().format("%H:%M:%S")
    );
    let _ = writeln!(out, "  {}", reading.summary_line());

    for v in a.violations() {
        let _ = writeln!(out, "  ! {}", v.describe());
    }
    if let Some(verdict) = a.verdict() {
        let _ = writeln!(
            out,
            "  Classifier: score {:.3} vs threshold {:.3} -> {}",
            verdict.score,
            verdict.threshold,
            if verdict.confirmed { "confirmed" } else { "rejected" }
        );
    }
    if let Some(d) = &outcome.diagnosis {
        let _ = writeln!(out, "  Diagnosis [{}] {}: {}", d.severity, d.subsystem, d.root_cause);
    }
    if let Some(r) = &outcome.recommendation {
        let _ = writeln!(out, "  Action [{}] ({}): {}", r.urgency, r.estimated_time, r.action);
        if !r.required_resources.is_empty() {
            let _ = writeln!(out, "    Resources: {}", r.required_resources.join(", "));
        }
    }
    for f in &outcome.failures {
        let _ = writeln!(out, "  {} failed: {}", f.stage, f.error);
    }

    out.trim_end().to_string()
}

/// Final run summary with a per-anomaly breakdown
pub fn format_summary(report: &RunReport) -> String {
    let t = report.totals();
    let mut out = String::new();
    let elapsed = report.finished_at - report.started_at;

    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(out, "RUN SUMMARY");
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(out, "  Cycles:              {}", t.cycles);
    let _ = writeln!(out, "  Faults injected:     {}", t.injected);
    let _ = writeln!(out, "  Threshold flagged:   {}", t.threshold_flagged);
    let _ = writeln!(out, "  Confirmed anomalies: {}", t.confirmed);
    let _ = writeln!(out, "  False alarms:        {}", t.false_alarms);
    let _ = writeln!(out, "  Diagnoses:           {}", t.diagnoses);
    let _ = writeln!(out, "  Recommendations:     {}", t.recommendations);
    let _ = writeln!(out, "  Failed stages:       {}", t.failed_stages);
    let _ = writeln!(out, "  Elapsed:             {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);

    if t.confirmed > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "Anomalies:");
        for o in report.anomalies() {
            let diagnosed = o.diagnosis.as_ref().map_or_else(
                || "no diagnosis".to_string(),
                |d| format!("{} ({})", d.root_cause, d.severity),
            );
            let urgency = o
                .recommendation
                .as_ref()
                .map_or_else(|| "-".to_string(), |r| r.urgency.to_string());
            let injected = o
                .assessment
                .reading()
                .injected_fault()
                .map_or_else(|| "none".to_string(), |f| f.to_string());
            let _ = writeln!(
                out,
                "  Cycle {:>3}: {} | score {:.3} | injected {} | urgency {}",
                o.cycle(),
                diagnosed,
                o.assessment.score().unwrap_or_default(),
                injected,
                urgency
            );
        }
    }

    let _ = write!(out, "{}", "=".repeat(RULE_WIDTH));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{CycleStage, StageFailure};
    use crate::types::{
        Assessment, BoundDirection, Channel, ClassifierVerdict, Diagnosis, InjectedFault, Reading,
        Severity, ThresholdViolation,
    };
    use chrono::Utc;

    fn confirmed_outcome() -> CycleOutcome {
        let reading = Reading::at(
            2,
            Utc::now(),
            [9000.0, 1900.0, 2.4, 750.0],
            Some(InjectedFault::VibrationSpike),
        )
        .unwrap();
        CycleOutcome {
            assessment: Assessment::scored(
                reading,
                vec![ThresholdViolation {
                    channel: Channel::Vibration,
                    value: 2.4,
                    bound: 1.0,
                    direction: BoundDirection::Above,
                }],
                Some(ClassifierVerdict {
                    score: 0.91,
                    threshold: 0.55,
                    confirmed: true,
                }),
            ),
            diagnosis: Some(Diagnosis {
                cycle: 2,
                root_cause: "Fan blade imbalance".to_string(),
                severity: Severity::Critical,
                subsystem: "Fan".to_string(),
            }),
            recommendation: None,
            failures: vec![StageFailure {
                stage: CycleStage::Recommend,
                error: "timeout".to_string(),
            }],
        }
    }

    #[test]
    fn test_cycle_block() {
        let text = format_cycle(&confirmed_outcome());
        assert!(text.contains("Cycle 2 [ANOMALY]"));
        assert!(text.contains("Vibration 2.40 mm/s above maximum"));
        assert!(text.contains("-> confirmed"));
        assert!(text.contains("Diagnosis [CRITICAL] Fan: Fan blade imbalance"));
        assert!(text.contains("Recommend failed: timeout"));
    }

    #[test]
    fn test_summary_lists_anomalies() {
        let now = Utc::now();
        let report = RunReport {
            started_at: now,
            finished_at: now,
            outcomes: vec![confirmed_outcome()],
        };
        let text = format_summary(&report);
        assert!(text.contains("Confirmed anomalies: 1"));
        assert!(text.contains("injected vibration_spike"));
        assert!(text.contains("Cycle   2: Fan blade imbalance (CRITICAL) | score 0.910"));
        assert!(text.contains("urgency -"));
    }

    #[test]
    fn test_summary_marks_undiagnosed_anomaly() {
        let mut outcome = confirmed_outcome();
        outcome.diagnosis = None;
        let now = Utc::now();
        let report = RunReport {
            started_at: now,
            finished_at: now,
            outcomes: vec![outcome],
        };
        assert!(format_summary(&report).contains("Cycle   2: no diagnosis | score"));
    }
}
