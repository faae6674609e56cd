//! Resolution Requester
//!
//! Turns a diagnosis into a maintenance recommendation via the
//! text-generation service.

use std::sync::Arc;

use tracing::{debug, info};

use super::{RequestError, RequestSettings};
use crate::config::PipelineConfig;
use crate::llm::parsing::{comma_list, label_value, labelled_field, required_field};
use crate::llm::{generate_with_retry, GenerationRequest, LlmBackend, ParseError, RequestKind, RetryPolicy};
use crate::pipeline::History;
use crate::types::{Diagnosis, Recommendation, Urgency};

const RESOLUTION_SYSTEM_PROMPT: &str = "You are a resolution agent that creates aircraft maintenance action plans. \
You receive a diagnosis and produce a concrete maintenance action, an urgency level, an estimated time to \
resolution and the resources (tools, parts, personnel) required.";

const RESOLUTION_PROMPT_TEMPLATE: &str = r#"Based on this diagnosis, provide a maintenance recommendation.

### DIAGNOSIS (cycle {cycle})
- Root cause: {root_cause}
- Severity: {severity}
- Subsystem: {subsystem}

### RECENT CYCLES
{history}

### OUTPUT FORMAT
Output ONLY the 4 lines below. No preamble. No markdown.
ACTION: [Step-by-step maintenance actions on one line]
URGENCY: [LOW | MEDIUM | HIGH | URGENT]
ESTIMATED_TIME: [e.g. 2 hours, next maintenance window]
RESOURCES: [Comma-separated tools, parts and personnel]
"#;

/// Parse a resolution reply. ACTION and URGENCY are required.
pub fn parse_recommendation(response: &str, cycle: u64) -> Result<Recommendation, ParseError> {
    let action = required_field(response, "ACTION")?;
    let urgency = label_value(response, "URGENCY", Urgency::from_label)?;
    let estimated_time =
        labelled_field(response, "ESTIMATED_TIME").unwrap_or_else(|| "Unknown".to_string());
    let required_resources = labelled_field(response, "RESOURCES")
        .map(|r| comma_list(&r))
        .unwrap_or_default();

    Ok(Recommendation {
        cycle,
        action,
        urgency,
        estimated_time,
        required_resources,
    })
}

pub struct ResolutionRequester {
    backend: Arc<dyn LlmBackend>,
    settings: RequestSettings,
}

impl ResolutionRequester {
    pub const fn new(backend: Arc<dyn LlmBackend>, settings: RequestSettings) -> Self {
        Self { backend, settings }
    }

    pub fn from_config(config: &PipelineConfig, backend: Arc<dyn LlmBackend>) -> Self {
        Self::new(
            backend,
            RequestSettings {
                model: config.models.resolution.clone(),
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
                retry: RetryPolicy::from_config(&config.llm),
                history_in_prompt: config.orchestrator.history_in_prompt,
            },
        )
    }

    pub fn build_prompt(&self, diagnosis: &Diagnosis, history: &History) -> String {
        RESOLUTION_PROMPT_TEMPLATE
            .replace("{cycle}", &diagnosis.cycle.to_string())
            .replace("{root_cause}", &diagnosis.root_cause)
            .replace("{severity}", &diagnosis.severity.to_string())
            .replace("{subsystem}", &diagnosis.subsystem)
            .replace("{history}", &history.context_block(self.settings.history_in_prompt))
    }

    /// Request a maintenance recommendation for an existing diagnosis.
    pub async fn recommend(
        &self,
        diagnosis: &Diagnosis,
        history: &History,
    ) -> Result<Recommendation, RequestError> {
        let request = GenerationRequest {
            kind: RequestKind::Resolution,
            model: self.settings.model.clone(),
            system_prompt: RESOLUTION_SYSTEM_PROMPT.to_string(),
            prompt: self.build_prompt(diagnosis, history),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        debug!(cycle = diagnosis.cycle, model = %request.model, "Requesting recommendation");

        let response = generate_with_retry(self.backend.as_ref(), &request, self.settings.retry).await?;
        let recommendation = parse_recommendation(&response, diagnosis.cycle)?;

        info!(
            cycle = recommendation.cycle,
            urgency = %recommendation.urgency,
            estimated_time = %recommendation.estimated_time,
            "Recommendation received"
        );
        Ok(recommendation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::StaticBackend;
    use crate::types::Severity;

    fn diagnosis() -> Diagnosis {
        Diagnosis {
            cycle: 6,
            root_cause: "Turbine blade damage".to_string(),
            severity: Severity::Critical,
            subsystem: "Engine".to_string(),
        }
    }

    #[test]
    fn test_parse_full_reply() {
        let r = parse_recommendation(
            "ACTION: Ground aircraft and borescope turbine\nURGENCY: URGENT\nESTIMATED_TIME: 6 hours\nRESOURCES: Borescope, Powerplant engineer",
            6,
        )
        .unwrap();
        assert_eq!(r.urgency, Urgency::Urgent);
        assert_eq!(r.estimated_time, "6 hours");
        assert_eq!(r.required_resources, vec!["Borescope", "Powerplant engineer"]);
    }

    #[test]
    fn test_parse_optional_fields_default() {
        let r = parse_recommendation("ACTION: Monitor\nURGENCY: low", 1).unwrap();
        assert_eq!(r.estimated_time, "Unknown");
        assert!(r.required_resources.is_empty());
    }

    #[test]
    fn test_parse_missing_urgency_fails() {
        assert_eq!(
            parse_recommendation("ACTION: Monitor", 1).unwrap_err(),
            ParseError::MissingField("URGENCY")
        );
    }

    #[test]
    fn test_prompt_embeds_diagnosis() {
        let requester =
            ResolutionRequester::from_config(&PipelineConfig::default(), Arc::new(StaticBackend::offline()));
        let prompt = requester.build_prompt(&diagnosis(), &History::new(3));
        assert!(prompt.contains("Root cause: Turbine blade damage"));
        assert!(prompt.contains("Severity: CRITICAL"));
        assert!(prompt.contains("No prior cycles."));
    }

    #[tokio::test]
    async fn test_recommend_with_static_backend() {
        let requester =
            ResolutionRequester::from_config(&PipelineConfig::default(), Arc::new(StaticBackend::offline()));
        let r = requester.recommend(&diagnosis(), &History::new(3)).await.unwrap();
        assert_eq!(r.cycle, 6);
        assert_eq!(r.urgency, Urgency::High);
        assert_eq!(r.required_resources.len(), 3);
    }
}
