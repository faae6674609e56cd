//! Config validation: unknown-key detection with Levenshtein suggestions
//! and suspicious-value warnings.
//!
//! Unknown keys are found by parsing the raw TOML into `toml::Value`,
//! walking the key tree and comparing against the known field names.
//! Serde deserialization runs afterwards. Warnings never reject a config.

use std::collections::HashSet;

use crate::acquisition::NOMINAL_ENVELOPE;
use crate::types::Channel;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for PipelineConfig.
///
/// Maintained by hand to match the struct hierarchy in pipeline_config.rs.
/// Any new field added to PipelineConfig must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [orchestrator]
        "orchestrator",
        "orchestrator.num_cycles",
        "orchestrator.anomaly_probability",
        "orchestrator.history_window",
        "orchestrator.history_in_prompt",
        "orchestrator.cycle_interval_ms",
        "orchestrator.seed",
        // [ml_model]
        "ml_model",
        "ml_model.n_samples",
        "ml_model.contamination",
        "ml_model.n_estimators",
        "ml_model.max_samples",
        "ml_model.seed",
        // [models]
        "models",
        "models.diagnosis",
        "models.resolution",
        "models.monitoring",
        // [llm]
        "llm",
        "llm.base_url",
        "llm.api_key",
        "llm.temperature",
        "llm.max_tokens",
        "llm.timeout_secs",
        "llm.max_retries",
        "llm.retry_backoff_ms",
        // [thresholds.*]
        "thresholds",
        "thresholds.rpm",
        "thresholds.rpm.min",
        "thresholds.rpm.max",
        "thresholds.pressure",
        "thresholds.pressure.min",
        "thresholds.pressure.max",
        "thresholds.vibration",
        "thresholds.vibration.min",
        "thresholds.vibration.max",
        "thresholds.egt",
        "thresholds.egt.min",
        "thresholds.egt.max",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist <= 3 {
            if let Some((_, best_dist)) = best {
                if dist < best_dist {
                    best = Some((k, dist));
                }
            } else {
                best = Some((k, dist));
            }
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// Unknown keys only warn; they never fail the load.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let found = walk_toml_keys(&value, "");
    let mut warnings = Vec::new();

    for key in &found {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(key, &known);
            let message = format!("Unknown config key '{key}'");
            warnings.push(ValidationWarning {
                field: key.clone(),
                message,
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Suspicious Value Warnings
// ============================================================================

/// Warn about values that validate but probably do not do what the operator
/// wants. Runs after `PipelineConfig::validate()`.
pub fn validate_ranges(config: &super::PipelineConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let o = &config.orchestrator;
    if o.anomaly_probability == 0.0 {
        warnings.push(ValidationWarning {
            field: "orchestrator.anomaly_probability".to_string(),
            message: "anomaly_probability = 0 means no faults are ever injected".to_string(),
            suggestion: None,
        });
    }
    if o.cycle_interval_ms > 60_000 {
        warnings.push(ValidationWarning {
            field: "orchestrator.cycle_interval_ms".to_string(),
            message: format!(
                "cycle_interval_ms = {} pauses more than a minute between cycles",
                o.cycle_interval_ms
            ),
            suggestion: None,
        });
    }

    let m = &config.ml_model;
    if m.n_samples < m.max_samples {
        warnings.push(ValidationWarning {
            field: "ml_model.max_samples".to_string(),
            message: format!(
                "max_samples = {} exceeds n_samples = {}; trees use all {} rows",
                m.max_samples, m.n_samples, m.n_samples
            ),
            suggestion: None,
        });
    }

    // Bounds narrower than the simulator's nominal envelope flag healthy readings
    for channel in Channel::ALL {
        let bounds = config.thresholds.bounds(channel);
        let (lo, hi) = NOMINAL_ENVELOPE[channel.index()];
        if bounds.min > lo || bounds.max < hi {
            warnings.push(ValidationWarning {
                field: format!("thresholds.{}", channel.key()),
                message: format!(
                    "thresholds.{} [{}, {}] does not cover the nominal range [{lo}, {hi}]; healthy readings will be flagged",
                    channel.key(),
                    bounds.min,
                    bounds.max
                ),
                suggestion: None,
            });
        }
    }

    warnings
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelBounds, PipelineConfig};

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("contamination", "contaminaton"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [thresholds]
            [thresholds.rpm]
            min = 8000.0
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"thresholds".to_string()));
        assert!(keys.contains(&"thresholds.rpm".to_string()));
        assert!(keys.contains(&"thresholds.rpm.min".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[ml_model]
contaminaton = 0.1
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].field.contains("contaminaton"));
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("ml_model.contamination")
        );
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[orchestrator]
num_cycles = 5
seed = 7

[models]
diagnosis = "gpt-4o"

[thresholds.egt]
min = 0.0
max = 950.0
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {warnings:?}");
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let warnings = validate_unknown_keys("[thresholds.oil_temp]\nmax = 120.0\n");
        assert!(warnings.iter().any(|w| w.field.contains("oil_temp")));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_defaults_produce_no_range_warnings() {
        let warnings = validate_ranges(&PipelineConfig::default());
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_narrow_bounds_warn() {
        let mut config = PipelineConfig::default();
        config.thresholds.pressure = ChannelBounds::new(1900.0, 2100.0);
        let warnings = validate_ranges(&config);
        assert!(warnings.iter().any(|w| w.field == "thresholds.pressure"));
    }

    #[test]
    fn test_zero_probability_warns() {
        let mut config = PipelineConfig::default();
        config.orchestrator.anomaly_probability = 0.0;
        let warnings = validate_ranges(&config);
        assert!(warnings
            .iter()
            .any(|w| w.field == "orchestrator.anomaly_probability"));
    }
}
