//! Labelled-field response parsing
//!
//! Replies are expected one field per line, `LABEL: value`. Labels match
//! case-insensitively and may carry markdown decoration (`**SEVERITY:** HIGH`,
//! `- ACTION: ...`) or a list number (`1. ROOT_CAUSE: ...`), which is stripped.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing required field {0}")]
    MissingField(&'static str),

    #[error("unrecognised {field} value '{value}'")]
    InvalidLabel { field: &'static str, value: String },
}

/// Value of the first `label:` line in `response`, trimmed. Empty values
/// count as absent.
pub fn labelled_field(response: &str, label: &str) -> Option<String> {
    let pattern = format!(
        r"(?im)^[ \t>*#-]*(?:\d+[.)])?[ \t>*#-]*{}[ \t*]*:[ \t*]*(.+?)[ \t*\r]*$",
        regex::escape(label)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Required field, or `ParseError::MissingField`
pub fn required_field(response: &str, label: &'static str) -> Result<String, ParseError> {
    labelled_field(response, label).ok_or(ParseError::MissingField(label))
}

/// Parse an enumerated label value with `parse`, tolerating a trailing period.
pub fn label_value<T>(
    response: &str,
    label: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ParseError> {
    let raw = required_field(response, label)?;
    parse(raw.trim_end_matches('.')).ok_or(ParseError::InvalidLabel {
        field: label,
        value: raw,
    })
}

/// Split a comma-separated list, dropping empty items.
pub fn comma_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    #[test]
    fn test_plain_field() {
        let text = "ROOT_CAUSE: Bearing wear\nSEVERITY: HIGH\n";
        assert_eq!(labelled_field(text, "ROOT_CAUSE").as_deref(), Some("Bearing wear"));
        assert_eq!(labelled_field(text, "SEVERITY").as_deref(), Some("HIGH"));
    }

    #[test]
    fn test_case_insensitive_and_markdown() {
        let text = "**Root_Cause:** Fuel nozzle coking\r\n- severity: critical";
        assert_eq!(
            labelled_field(text, "ROOT_CAUSE").as_deref(),
            Some("Fuel nozzle coking")
        );
        assert_eq!(labelled_field(text, "SEVERITY").as_deref(), Some("critical"));
    }

    #[test]
    fn test_numbered_list_reply() {
        let text = "1. ROOT_CAUSE: Bearing wear\n2) **SEVERITY:** HIGH\n3. SUBSYSTEM: Oil system";
        assert_eq!(labelled_field(text, "ROOT_CAUSE").as_deref(), Some("Bearing wear"));
        assert_eq!(labelled_field(text, "SEVERITY").as_deref(), Some("HIGH"));
        assert_eq!(labelled_field(text, "SUBSYSTEM").as_deref(), Some("Oil system"));
    }

    #[test]
    fn test_empty_value_does_not_borrow_next_line() {
        let text = "SUBSYSTEM:\nACTION: Replace pump";
        assert!(labelled_field(text, "SUBSYSTEM").is_none());
    }

    #[test]
    fn test_label_value_errors() {
        assert_eq!(
            label_value("ROOT_CAUSE: x", "SEVERITY", Severity::from_label),
            Err(ParseError::MissingField("SEVERITY"))
        );
        assert_eq!(
            label_value("SEVERITY: SEVERE", "SEVERITY", Severity::from_label),
            Err(ParseError::InvalidLabel {
                field: "SEVERITY",
                value: "SEVERE".to_string()
            })
        );
        assert_eq!(
            label_value("SEVERITY: Medium.", "SEVERITY", Severity::from_label),
            Ok(Severity::Medium)
        );
    }

    #[test]
    fn test_comma_list() {
        assert_eq!(
            comma_list("Technician, Borescope, ,Torque wrench"),
            vec!["Technician", "Borescope", "Torque wrench"]
        );
    }
}
