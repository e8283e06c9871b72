//! Observation lifecycle
//!
//! ```text
//! draft --(evidence >= min)--> reviewed --(approve)--> active
//!   |                            |                       |
//!   +----------(approve)---------+                       |
//!   +------------------(deprecate)-----------------------+--> deprecated
//! ```
//!
//! `deprecated` is terminal. Only `active` observations reach evaluation
//! prompts.

use super::reflection::CandidatePattern;
use crate::core::error::DomainError;
use crate::core::string::token_jaccard;
use crate::evaluation::Confidence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Learning thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningPolicy {
    /// Evidence needed for automatic draft -> reviewed promotion
    pub min_evidence: u32,
    /// Token similarity at which a candidate reuses an existing observation
    pub similarity_threshold: f64,
    /// Active observations included per evaluation prompt
    pub max_prompt_observations: usize,
}

impl Default for LearningPolicy {
    fn default() -> Self {
        Self {
            min_evidence: 5,
            similarity_threshold: 0.6,
            max_prompt_observations: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationStatus {
    Draft,
    Reviewed,
    Active,
    Deprecated,
}

impl ObservationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ObservationStatus::Draft => "draft",
            ObservationStatus::Reviewed => "reviewed",
            ObservationStatus::Active => "active",
            ObservationStatus::Deprecated => "deprecated",
        }
    }

    /// Candidates may merge into observations in this state
    pub fn accepts_candidates(&self) -> bool {
        matches!(self, ObservationStatus::Draft | ObservationStatus::Reviewed)
    }
}

impl std::fmt::Display for ObservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ObservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(ObservationStatus::Draft),
            "reviewed" => Ok(ObservationStatus::Reviewed),
            "active" => Ok(ObservationStatus::Active),
            "deprecated" => Ok(ObservationStatus::Deprecated),
            _ => Err(DomainError::InvalidValue {
                field: "observation status",
                value: s.to_string(),
            }),
        }
    }
}

/// Persona-scoped reusable pattern (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub persona_id: String,
    pub pattern: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: ObservationStatus,
    pub validations: u32,
    pub invalidations: u32,
    pub evidence_count: u32,
    /// validations / evidence_count
    pub confidence: f64,
    #[serde(default)]
    pub supporting_proposal_ids: Vec<String>,
    /// Learning events already counted as evidence
    #[serde(default)]
    pub counted_event_ids: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Observation {
    /// New draft carrying the candidate's first piece of evidence
    pub fn new_draft(
        persona_id: impl Into<String>,
        candidate: &CandidatePattern,
        proposal_id: &str,
        event_id: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            persona_id: persona_id.into(),
            pattern: candidate.pattern.clone(),
            context: candidate.context.clone(),
            tags: candidate.tags.clone(),
            status: ObservationStatus::Draft,
            validations: 1,
            invalidations: 0,
            evidence_count: 1,
            confidence: 1.0,
            supporting_proposal_ids: vec![proposal_id.to_string()],
            counted_event_ids: BTreeSet::from([event_id.to_string()]),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the generated id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ObservationStatus::Active
    }

    /// Count one piece of evidence from a learning event.
    ///
    /// Returns `Ok(false)` when the event was already counted. Promotes a
    /// draft to reviewed once evidence reaches `min_evidence`.
    pub fn record_evidence(
        &mut self,
        event_id: &str,
        proposal_id: &str,
        validated: bool,
        min_evidence: u32,
    ) -> Result<bool, DomainError> {
        if self.status == ObservationStatus::Deprecated {
            return Err(DomainError::transition(
                "observation",
                self.status,
                "evidence on deprecated observation",
            ));
        }
        if !self.counted_event_ids.insert(event_id.to_string()) {
            return Ok(false);
        }

        if validated {
            self.validations += 1;
        } else {
            self.invalidations += 1;
        }
        self.evidence_count = self.validations + self.invalidations;
        self.confidence = f64::from(self.validations) / f64::from(self.evidence_count);
        if !self.supporting_proposal_ids.iter().any(|p| p == proposal_id) {
            self.supporting_proposal_ids.push(proposal_id.to_string());
        }
        if self.status == ObservationStatus::Draft && self.evidence_count >= min_evidence {
            self.status = ObservationStatus::Reviewed;
        }
        self.updated_at = Utc::now();
        Ok(true)
    }

    /// Human approval: draft or reviewed -> active
    pub fn approve(&mut self) -> Result<(), DomainError> {
        if !self.status.accepts_candidates() {
            return Err(DomainError::transition(
                "observation",
                self.status,
                ObservationStatus::Active,
            ));
        }
        self.status = ObservationStatus::Active;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Any non-deprecated state -> deprecated
    pub fn deprecate(&mut self) -> Result<(), DomainError> {
        if self.status == ObservationStatus::Deprecated {
            return Err(DomainError::transition(
                "observation",
                self.status,
                ObservationStatus::Deprecated,
            ));
        }
        self.status = ObservationStatus::Deprecated;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Categorical confidence; low until at least three pieces of evidence
    pub fn confidence_level(&self) -> Confidence {
        if self.evidence_count < 3 {
            Confidence::Low
        } else if self.confidence >= 0.8 {
            Confidence::High
        } else if self.confidence >= 0.5 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn similarity(&self, pattern: &str) -> f64 {
        token_jaccard(&self.pattern, pattern)
    }

    fn tag_overlap(&self, tags: &[String]) -> usize {
        self.tags.iter().filter(|t| tags.contains(t)).count()
    }
}

/// Most similar draft/reviewed observation of `persona_id` at or above
/// `threshold`
pub fn best_match<'a>(
    observations: &'a [Observation],
    persona_id: &str,
    pattern: &str,
    threshold: f64,
) -> Option<&'a Observation> {
    observations
        .iter()
        .filter(|o| o.persona_id == persona_id && o.status.accepts_candidates())
        .map(|o| (o, o.similarity(pattern)))
        .filter(|(_, score)| *score >= threshold)
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(o, _)| o)
}

/// Active observations of a persona for an evaluation prompt, ranked by
/// tag overlap with the proposal, then confidence, then evidence
pub fn select_for_prompt<'a>(
    observations: &'a [Observation],
    persona_id: &str,
    proposal_tags: &[String],
    limit: usize,
) -> Vec<&'a Observation> {
    let mut selected: Vec<&Observation> = observations
        .iter()
        .filter(|o| o.persona_id == persona_id && o.is_active())
        .collect();
    selected.sort_by(|a, b| {
        b.tag_overlap(proposal_tags)
            .cmp(&a.tag_overlap(proposal_tags))
            .then(b.confidence.total_cmp(&a.confidence))
            .then(b.evidence_count.cmp(&a.evidence_count))
            .then(a.id.cmp(&b.id))
    });
    selected.truncate(limit);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(pattern: &str, tags: &[&str]) -> CandidatePattern {
        CandidatePattern {
            pattern: pattern.to_string(),
            context: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn draft(pattern: &str) -> Observation {
        Observation::new_draft("budget", &candidate(pattern, &[]), "p0", "e0")
    }

    #[test]
    fn test_new_draft_has_one_evidence() {
        let obs = draft("Front-loaded budgets predict missed milestones");
        assert_eq!(obs.status, ObservationStatus::Draft);
        assert_eq!(obs.evidence_count, 1);
        assert_eq!(obs.confidence, 1.0);
        assert_eq!(obs.confidence_level(), Confidence::Low);
    }

    #[test]
    fn test_evidence_is_idempotent_per_event() {
        let mut obs = draft("pattern text here");
        assert!(obs.record_evidence("e1", "p1", true, 5).unwrap());
        assert!(!obs.record_evidence("e1", "p1", true, 5).unwrap());
        assert_eq!(obs.evidence_count, 2);
    }

    #[test]
    fn test_confidence_recomputed_after_each_increment() {
        let mut obs = draft("pattern text here");
        obs.record_evidence("e1", "p1", false, 10).unwrap();
        assert_eq!(obs.confidence, 0.5);
        obs.record_evidence("e2", "p2", true, 10).unwrap();
        assert!((obs.confidence - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(obs.evidence_count, 3);
        assert_eq!(obs.confidence_level(), Confidence::Medium);
    }

    #[test]
    fn test_auto_promotion_at_min_evidence() {
        let mut obs = draft("pattern text here");
        for i in 1..4 {
            obs.record_evidence(&format!("e{}", i), "p", true, 5).unwrap();
            assert_eq!(obs.status, ObservationStatus::Draft);
        }
        obs.record_evidence("e4", "p", true, 5).unwrap();
        assert_eq!(obs.status, ObservationStatus::Reviewed);
        assert_eq!(obs.confidence_level(), Confidence::High);
    }

    #[test]
    fn test_approve_and_deprecate_transitions() {
        let mut obs = draft("pattern text here");
        obs.approve().unwrap();
        assert!(obs.is_active());
        assert!(obs.approve().unwrap_err().is_invalid_transition());

        obs.deprecate().unwrap();
        assert!(obs.deprecate().is_err());
        assert!(obs.approve().is_err());
        assert!(obs.record_evidence("e9", "p9", true, 5).is_err());
        assert_eq!(obs.status, ObservationStatus::Deprecated);
    }

    #[test]
    fn test_best_match_respects_persona_status_and_threshold() {
        let mut active = draft("teams without prior shipped work miss deadlines");
        active.approve().unwrap();
        let pending = draft("teams without prior shipped work usually miss deadlines");
        let observations = vec![active, pending.clone()];

        let found = best_match(
            &observations,
            "budget",
            "teams without shipped prior work miss deadlines",
            0.6,
        );
        assert_eq!(found.map(|o| o.id.as_str()), Some(pending.id.as_str()));
        assert!(best_match(&observations, "impact", "teams without prior shipped work", 0.6).is_none());
        assert!(best_match(&observations, "budget", "unrelated words entirely", 0.6).is_none());
    }

    #[test]
    fn test_select_for_prompt_ranks_by_tags_then_confidence() {
        let mut tagged = Observation::new_draft("budget", &candidate("alpha beta gamma", &["small_grant"]), "p", "e");
        tagged.approve().unwrap();
        let mut confident = Observation::new_draft("budget", &candidate("delta epsilon zeta", &[]), "p", "e");
        confident.approve().unwrap();
        let mut weak = confident.clone();
        weak.id = "weak".into();
        weak.confidence = 0.4;
        let observations = vec![weak, confident.clone(), tagged.clone(), draft("not active")];

        let selected = select_for_prompt(&observations, "budget", &["small_grant".to_string()], 2);
        let ids: Vec<&str> = selected.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec![tagged.id.as_str(), confident.id.as_str()]);
    }
}
