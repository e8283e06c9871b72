//! Deliberation configuration from TOML (`[deliberation]` section)

use council_domain::{ConfigIssue, ConfigIssueCode, DeliberationPolicy, DeliberationTrigger};
use serde::{Deserialize, Serialize};

const TRIGGERS: &[&str] = &["always", "conditional", "never"];

/// Raw deliberation configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDeliberationConfig {
    /// "always" | "conditional" | "never"
    pub trigger: String,
    pub rounds: u32,
    /// Conditional trigger: deliberate requests at or above this amount
    pub min_amount: f64,
    /// Conditional trigger: deliberate split panels regardless of amount
    pub on_split: bool,
}

impl Default for FileDeliberationConfig {
    fn default() -> Self {
        Self {
            trigger: "always".to_string(),
            rounds: DeliberationPolicy::default().rounds,
            min_amount: 50_000.0,
            on_split: true,
        }
    }
}

impl FileDeliberationConfig {
    /// Convert to the domain policy. An unknown trigger falls back to
    /// "always" and is reported.
    pub fn to_policy(&self) -> (DeliberationPolicy, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let trigger = match self.trigger.trim().to_lowercase().as_str() {
            "always" => DeliberationTrigger::Always,
            "never" | "off" | "disabled" => DeliberationTrigger::Never,
            "conditional" => DeliberationTrigger::Conditional {
                min_amount: self.min_amount,
                on_split: self.on_split,
            },
            other => {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue,
                    format!(
                        "deliberation.trigger: unknown value '{}' (expected one of {}), falling back to 'always'",
                        other,
                        TRIGGERS.join(", ")
                    ),
                ));
                DeliberationTrigger::Always
            }
        };
        (
            DeliberationPolicy {
                trigger,
                rounds: self.rounds,
            },
            issues,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_spellings() {
        let config = FileDeliberationConfig {
            trigger: "Never".to_string(),
            ..Default::default()
        };
        let (policy, issues) = config.to_policy();
        assert_eq!(policy.trigger, DeliberationTrigger::Never);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_unknown_trigger_falls_back() {
        let config = FileDeliberationConfig {
            trigger: "weekly".to_string(),
            rounds: 3,
            ..Default::default()
        };
        let (policy, issues) = config.to_policy();
        assert_eq!(policy.trigger, DeliberationTrigger::Always);
        assert_eq!(policy.rounds, 3);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ConfigIssueCode::InvalidEnumValue);
    }
}
