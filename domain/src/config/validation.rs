//! Configuration issues
//!
//! Validation never fails fast: every problem found is reported with a
//! severity so callers can print warnings and refuse to start on errors.

use serde::Serialize;

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fatal: the council cannot run with this configuration.
    Error,
    /// Non-fatal: the council runs but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigIssueCode {
    /// No reviewer personas configured.
    EmptyPanel,
    /// Two personas share an id.
    DuplicatePersonaId,
    /// A persona has no text-generation target.
    MissingModel,
    /// A consensus or similarity threshold is outside `[0, 1]`.
    ThresholdOutOfRange,
    /// The human-review amount is not positive, so nothing auto-executes.
    NonPositiveReviewAmount,
    /// Deliberation is enabled with zero rounds.
    ZeroDeliberationRounds,
    /// Observations would be promoted with no evidence at all.
    ZeroMinEvidence,
    /// A single-persona panel makes deliberation meaningless.
    SinglePersonaPanel,
    /// A configuration value is not one of the accepted spellings.
    InvalidEnumValue,
    /// A persona override names an id that is not on the panel.
    UnknownPersona,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)
    }
}

/// Check that a threshold lies in `[0, 1]`
pub fn check_unit_interval(name: &str, value: f64, issues: &mut Vec<ConfigIssue>) {
    if !(0.0..=1.0).contains(&value) {
        issues.push(ConfigIssue::error(
            ConfigIssueCode::ThresholdOutOfRange,
            format!("{} must be between 0 and 1 (got {})", name, value),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_interval() {
        let mut issues = Vec::new();
        check_unit_interval("auto_approve_consensus", 0.85, &mut issues);
        assert!(issues.is_empty());
        check_unit_interval("auto_approve_consensus", 1.5, &mut issues);
        check_unit_interval("similarity", f64::NAN, &mut issues);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(ConfigIssue::is_error));
    }

    #[test]
    fn test_display() {
        let issue = ConfigIssue::warning(ConfigIssueCode::ZeroMinEvidence, "min_evidence is 0");
        assert_eq!(issue.to_string(), "warning: min_evidence is 0");
    }
}
