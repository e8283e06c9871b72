//! Council configuration.
//!
//! [`CouncilConfig`] is built once at process start and shared as
//! `Arc<CouncilConfig>` by every use case. Nothing mutates it afterwards.

use council_domain::config::check_unit_interval;
use council_domain::{
    ConfigIssue, ConfigIssueCode, DeliberationPolicy, DeliberationTrigger, LearningPolicy,
    MatchingThresholds, PersonaConfig, RoutingThresholds, Severity,
};
use std::collections::HashSet;
use std::time::Duration;

/// Default per-call timeout for text generation
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Process-wide council configuration
#[derive(Debug, Clone)]
pub struct CouncilConfig {
    /// Reviewer panel, in presentation order
    pub personas: Vec<PersonaConfig>,
    /// Target used for Stage-1 structured extraction
    pub parser: PersonaConfig,
    pub routing: RoutingThresholds,
    pub deliberation: DeliberationPolicy,
    pub matching: MatchingThresholds,
    pub learning: LearningPolicy,
    /// Per-call timeout unless a persona overrides it
    pub request_timeout: Duration,
    /// Similar past proposals included in each evaluation prompt
    pub similar_proposal_limit: usize,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            personas: PersonaConfig::default_panel(),
            parser: PersonaConfig::default_parser(),
            routing: RoutingThresholds::default(),
            deliberation: DeliberationPolicy::default(),
            matching: MatchingThresholds::default(),
            learning: LearningPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            similar_proposal_limit: 3,
        }
    }
}

impl CouncilConfig {
    pub fn with_personas(mut self, personas: Vec<PersonaConfig>) -> Self {
        self.personas = personas;
        self
    }

    pub fn with_routing(mut self, routing: RoutingThresholds) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_deliberation(mut self, deliberation: DeliberationPolicy) -> Self {
        self.deliberation = deliberation;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn persona(&self, id: &str) -> Option<&PersonaConfig> {
        self.personas.iter().find(|p| p.id == id)
    }

    /// Timeout for one call made on behalf of `persona`
    pub fn timeout_for(&self, persona: &PersonaConfig) -> Duration {
        persona
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.request_timeout)
    }

    // ==================== Validation ====================

    /// Validate the configuration, reporting every issue found.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.personas.is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyPanel,
                "at least one reviewer persona is required",
            ));
        } else if self.personas.len() == 1
            && !matches!(self.deliberation.trigger, DeliberationTrigger::Never)
        {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::SinglePersonaPanel,
                "a single-persona panel has no peers to deliberate with",
            ));
        }

        let mut seen = HashSet::new();
        for persona in &self.personas {
            if !seen.insert(persona.id.as_str()) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicatePersonaId,
                    format!("persona id '{}' is used more than once", persona.id),
                ));
            }
        }
        for persona in self.personas.iter().chain(std::iter::once(&self.parser)) {
            if persona.model.trim().is_empty() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::MissingModel,
                    format!("persona '{}' has no model", persona.id),
                ));
            }
        }

        check_unit_interval(
            "routing.auto_approve_consensus",
            self.routing.auto_approve_consensus,
            &mut issues,
        );
        check_unit_interval(
            "routing.auto_reject_consensus",
            self.routing.auto_reject_consensus,
            &mut issues,
        );
        check_unit_interval(
            "matching.name_similarity",
            self.matching.name_similarity,
            &mut issues,
        );
        check_unit_interval(
            "learning.similarity_threshold",
            self.learning.similarity_threshold,
            &mut issues,
        );

        if self.routing.human_review_amount <= 0.0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::NonPositiveReviewAmount,
                "routing.human_review_amount is not positive; every proposal will need review",
            ));
        }
        if self.deliberation.rounds == 0
            && !matches!(self.deliberation.trigger, DeliberationTrigger::Never)
        {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroDeliberationRounds,
                "deliberation is enabled with 0 rounds; Stage 3 will be a no-op",
            ));
        }
        if self.learning.min_evidence == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroMinEvidence,
                "learning.min_evidence is 0; drafts are promoted immediately",
            ));
        }

        issues
    }

    /// Check whether any issues are errors (i.e. fatal).
    pub fn has_errors(issues: &[ConfigIssue]) -> bool {
        issues.iter().any(|i| i.severity == Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(CouncilConfig::default().validate().is_empty());
    }

    #[test]
    fn test_empty_panel_is_fatal() {
        let issues = CouncilConfig::default().with_personas(vec![]).validate();
        assert!(CouncilConfig::has_errors(&issues));
        assert_eq!(issues[0].code, ConfigIssueCode::EmptyPanel);
    }

    #[test]
    fn test_duplicate_ids_and_bad_thresholds() {
        let config = CouncilConfig::default()
            .with_personas(vec![PersonaConfig::technical(), PersonaConfig::technical()])
            .with_routing(RoutingThresholds {
                auto_approve_consensus: 1.2,
                ..Default::default()
            });
        let codes: Vec<ConfigIssueCode> = config.validate().iter().map(|i| i.code).collect();
        assert!(codes.contains(&ConfigIssueCode::DuplicatePersonaId));
        assert!(codes.contains(&ConfigIssueCode::ThresholdOutOfRange));
    }

    #[test]
    fn test_warnings_are_not_fatal() {
        let config = CouncilConfig::default().with_deliberation(DeliberationPolicy {
            trigger: DeliberationTrigger::Always,
            rounds: 0,
        });
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(!CouncilConfig::has_errors(&issues));
    }

    #[test]
    fn test_timeout_override() {
        let config = CouncilConfig::default();
        let persona = PersonaConfig::budget().with_timeout_secs(15);
        assert_eq!(config.timeout_for(&persona), Duration::from_secs(15));
        assert_eq!(config.timeout_for(&PersonaConfig::impact()), DEFAULT_REQUEST_TIMEOUT);
    }
}
