//! Decision entity

use super::consensus::{ConsensusOutcome, Vote};
use super::routing::{RoutingOutcome, RoutingRule};
use crate::core::error::DomainError;
use crate::evaluation::{Recommendation, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Status of a Decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Pending,
    AutoApproved,
    AutoRejected,
    NeedsReview,
    HumanApproved,
    HumanRejected,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DecisionStatus::Pending => "pending",
            DecisionStatus::AutoApproved => "auto_approved",
            DecisionStatus::AutoRejected => "auto_rejected",
            DecisionStatus::NeedsReview => "needs_review",
            DecisionStatus::HumanApproved => "human_approved",
            DecisionStatus::HumanRejected => "human_rejected",
        }
    }

    /// Whether a human decision may still be recorded
    pub fn accepts_human_decision(&self) -> bool {
        !matches!(
            self,
            DecisionStatus::HumanApproved | DecisionStatus::HumanRejected
        )
    }

    /// Side the status resolves to, if resolved
    pub fn resolved_side(&self) -> Option<Side> {
        match self {
            DecisionStatus::AutoApproved | DecisionStatus::HumanApproved => Some(Side::Approve),
            DecisionStatus::AutoRejected | DecisionStatus::HumanRejected => Some(Side::Reject),
            DecisionStatus::Pending | DecisionStatus::NeedsReview => None,
        }
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DecisionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(DecisionStatus::Pending),
            "auto_approved" => Ok(DecisionStatus::AutoApproved),
            "auto_rejected" => Ok(DecisionStatus::AutoRejected),
            "needs_review" => Ok(DecisionStatus::NeedsReview),
            "human_approved" => Ok(DecisionStatus::HumanApproved),
            "human_rejected" => Ok(DecisionStatus::HumanRejected),
            _ => Err(DomainError::InvalidValue {
                field: "decision status",
                value: s.to_string(),
            }),
        }
    }
}

/// A human's ruling on a proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanDecision {
    pub verdict: Side,
    pub notes: String,
    /// Status the Decision had before the human ruled
    pub previous_status: DecisionStatus,
    pub decided_at: DateTime<Utc>,
}

/// The panel's terminal aggregate for one proposal (Entity)
///
/// Exactly one per proposal, keyed by the proposal id. After creation only
/// the single human-decision transition may mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub proposal_id: String,
    pub votes: Vec<Vote>,
    pub primary_recommendation: Recommendation,
    pub primary_side: Side,
    pub consensus_strength: f64,
    pub unanimous: bool,
    pub auto_executed: bool,
    pub routing_rule: RoutingRule,
    pub routing_reason: String,
    pub status: DecisionStatus,
    /// Markdown summary for reviewers
    pub summary: String,
    #[serde(default)]
    pub key_concerns: Vec<String>,
    #[serde(default)]
    pub key_strengths: Vec<String>,
    #[serde(default)]
    pub human: Option<HumanDecision>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Decision {
    pub fn new(
        proposal_id: impl Into<String>,
        votes: Vec<Vote>,
        consensus: &ConsensusOutcome,
        routing: RoutingOutcome,
    ) -> Self {
        let now = Utc::now();
        Self {
            proposal_id: proposal_id.into(),
            votes,
            primary_recommendation: consensus.primary_recommendation,
            primary_side: consensus.primary_side,
            consensus_strength: consensus.consensus_strength,
            unanimous: consensus.unanimous,
            auto_executed: routing.auto_executed,
            routing_rule: routing.rule,
            routing_reason: routing.reason,
            status: routing.status,
            summary: String::new(),
            key_concerns: Vec::new(),
            key_strengths: Vec::new(),
            human: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record the human ruling.
    ///
    /// Valid from `pending`, `needs_review` and the auto-executed states;
    /// returns whether the ruling contradicts the panel's primary side.
    pub fn record_human(
        &mut self,
        verdict: Side,
        notes: impl Into<String>,
    ) -> Result<bool, DomainError> {
        let next = match verdict {
            Side::Approve => DecisionStatus::HumanApproved,
            Side::Reject => DecisionStatus::HumanRejected,
        };
        if !self.status.accepts_human_decision() {
            return Err(DomainError::transition("decision", self.status, next));
        }

        let now = Utc::now();
        self.human = Some(HumanDecision {
            verdict,
            notes: notes.into(),
            previous_status: self.status,
            decided_at: now,
        });
        self.status = next;
        self.updated_at = now;
        Ok(verdict != self.primary_side)
    }

    pub fn fallback_votes(&self) -> usize {
        self.votes.iter().filter(|v| v.fallback).count()
    }
}
