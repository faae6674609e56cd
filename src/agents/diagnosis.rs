//! Diagnosis Requester
//!
//! Builds a root-cause prompt for a confirmed anomaly, sends it to the
//! text-generation service and parses the reply into a `Diagnosis`.

use std::sync::Arc;

use tracing::{debug, info};

use super::{RequestError, RequestSettings};
use crate::config::PipelineConfig;
use crate::llm::parsing::{label_value, labelled_field, required_field};
use crate::llm::{generate_with_retry, GenerationRequest, LlmBackend, ParseError, RequestKind, RetryPolicy};
use crate::pipeline::History;
use crate::types::{ConfirmedAnomaly, Diagnosis, Severity};

const DIAGNOSIS_SYSTEM_PROMPT: &str = "You are a diagnosis agent specialising in aircraft engine root cause analysis. \
You receive confirmed anomaly data and identify the root cause, a severity level (low, medium, high, critical) \
and the affected subsystem (engine, hydraulic, electrical, etc.). Be clear and concise and base the diagnosis on \
the telemetry pattern.";

const DIAGNOSIS_PROMPT_TEMPLATE: &str = r#"Analyze this aircraft engine telemetry anomaly and provide a diagnosis.

### TELEMETRY (cycle {cycle})
- RPM: {rpm} rpm
- Pressure: {pressure} PSI
- Vibration: {vibration} mm/s
- EGT: {egt} °C
- Anomaly score: {score} (threshold {threshold})

### THRESHOLD VIOLATIONS
{violations}

### RECENT CYCLES
{history}

### OUTPUT FORMAT
Output ONLY the 3 lines below. No preamble. No markdown.
ROOT_CAUSE: [Brief description of the likely root cause]
SEVERITY: [LOW | MEDIUM | HIGH | CRITICAL]
SUBSYSTEM: [Affected subsystem, e.g. Engine, Hydraulic System, Electrical]
"#;

/// Parse a diagnosis reply. ROOT_CAUSE and SEVERITY are required.
pub fn parse_diagnosis(response: &str, cycle: u64) -> Result<Diagnosis, ParseError> {
    let root_cause = required_field(response, "ROOT_CAUSE")?;
    let severity = label_value(response, "SEVERITY", Severity::from_label)?;
    let subsystem = labelled_field(response, "SUBSYSTEM").unwrap_or_else(|| "Unknown".to_string());

    Ok(Diagnosis {
        cycle,
        root_cause,
        severity,
        subsystem,
    })
}

pub struct DiagnosisRequester {
    backend: Arc<dyn LlmBackend>,
    settings: RequestSettings,
}

impl DiagnosisRequester {
    pub const fn new(backend: Arc<dyn LlmBackend>, settings: RequestSettings) -> Self {
        Self { backend, settings }
    }

    pub fn from_config(config: &PipelineConfig, backend: Arc<dyn LlmBackend>) -> Self {
        Self::new(
            backend,
            RequestSettings {
                model: config.models.diagnosis.clone(),
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
                retry: RetryPolicy::from_config(&config.llm),
                history_in_prompt: config.orchestrator.history_in_prompt,
            },
        )
    }

    pub fn build_prompt(&self, anomaly: &ConfirmedAnomaly<'_>, history: &History) -> String {
        let reading = anomaly.reading();
        let violations: Vec<String> = anomaly
            .violations()
            .iter()
            .map(|v| format!("- {}", v.describe()))
            .collect();

        DIAGNOSIS_PROMPT_TEMPLATE
            .replace("{cycle}", &reading.cycle().to_string())
            .replace("{rpm}", &format!("{:.0}", reading.rpm()))
            .replace("{pressure}", &format!("{:.0}", reading.pressure()))
            .replace("{vibration}", &format!("{:.2}", reading.vibration()))
            .replace("{egt}", &format!("{:.0}", reading.egt()))
            .replace("{score}", &format!("{:.3}", anomaly.score()))
            .replace("{threshold}", &format!("{:.3}", anomaly.threshold()))
            .replace("{violations}", &violations.join("\n"))
            .replace("{history}", &history.context_block(self.settings.history_in_prompt))
    }

    /// Request a diagnosis. Only a confirmed anomaly can be diagnosed.
    pub async fn diagnose(
        &self,
        anomaly: ConfirmedAnomaly<'_>,
        history: &History,
    ) -> Result<Diagnosis, RequestError> {
        let request = GenerationRequest {
            kind: RequestKind::Diagnosis,
            model: self.settings.model.clone(),
            system_prompt: DIAGNOSIS_SYSTEM_PROMPT.to_string(),
            prompt: self.build_prompt(&anomaly, history),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        debug!(cycle = anomaly.cycle(), model = %request.model, "Requesting diagnosis");

        let response = generate_with_retry(self.backend.as_ref(), &request, self.settings.retry).await?;
        let diagnosis = parse_diagnosis(&response, anomaly.cycle())?;

        info!(
            cycle = diagnosis.cycle,
            severity = %diagnosis.severity,
            subsystem = %diagnosis.subsystem,
            "Diagnosis received"
        );
        Ok(diagnosis)
    }
}
