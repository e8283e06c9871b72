//! Deliberation policy and records

use super::anonymize::PeerBundle;
use crate::evaluation::{Evaluation, PositionChange, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// When Stage 3 runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeliberationTrigger {
    /// Every proposal is deliberated
    #[default]
    Always,
    /// Only large requests or split panels are deliberated
    Conditional { min_amount: f64, on_split: bool },
    /// Deliberation is disabled
    Never,
}

impl DeliberationTrigger {
    /// Decide whether deliberation is warranted; `None` means run, otherwise
    /// the reason it is skipped.
    pub fn skip_reason(&self, amount: f64, evaluations: &[Evaluation]) -> Option<String> {
        let real: Vec<&Evaluation> = evaluations.iter().filter(|e| !e.is_fallback()).collect();
        if real.len() < 2 {
            return Some(format!(
                "only {} successful evaluation(s); nothing to deliberate",
                real.len()
            ));
        }

        match self {
            DeliberationTrigger::Always => None,
            DeliberationTrigger::Never => Some("deliberation disabled".to_string()),
            DeliberationTrigger::Conditional {
                min_amount,
                on_split,
            } => {
                let split = real.iter().any(|e| e.side() == Side::Approve)
                    && real.iter().any(|e| e.side() == Side::Reject);
                if amount >= *min_amount || (*on_split && split) {
                    None
                } else {
                    Some(format!(
                        "amount {:.0} below {:.0} and panel not split",
                        amount, min_amount
                    ))
                }
            }
        }
    }
}

/// Stage-3 configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeliberationPolicy {
    pub trigger: DeliberationTrigger,
    /// Fixed number of passes; no convergence detection
    pub rounds: u32,
}

impl Default for DeliberationPolicy {
    fn default() -> Self {
        Self {
            trigger: DeliberationTrigger::Always,
            rounds: 1,
        }
    }
}

/// Outcome of one persona's turn in a round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaTurn {
    pub persona_id: String,
    /// Net direction against the original stance after this turn
    pub change: PositionChange,
    pub response: String,
    /// Set when the call failed; the evaluation was left untouched
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// One pass of deliberation over the panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliberationRound {
    pub round: u32,
    /// Anonymized peer bundle each persona was shown
    pub bundles: Vec<PeerBundle>,
    pub turns: Vec<PersonaTurn>,
}

/// Deliberation record of one proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliberationRecord {
    pub proposal_id: String,
    pub rounds: Vec<DeliberationRound>,
    /// Why deliberation did not run, if it was skipped
    #[serde(default)]
    pub skipped: Option<String>,
    /// Number of personas whose final stance differs from their original one
    pub position_changes: usize,
    #[serde(default)]
    pub changed_personas: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl DeliberationRecord {
    pub fn new(proposal_id: impl Into<String>) -> Self {
        Self {
            proposal_id: proposal_id.into(),
            rounds: Vec::new(),
            skipped: None,
            position_changes: 0,
            changed_personas: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn skipped(proposal_id: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut record = Self::new(proposal_id);
        record.skipped = Some(reason.into());
        record
    }

    /// Recount position changes from the revised evaluations
    pub fn tally(&mut self, evaluations: &[Evaluation]) {
        self.changed_personas = evaluations
            .iter()
            .filter(|e| e.position_changed.is_changed())
            .map(|e| e.persona_id.clone())
            .collect();
        self.position_changes = self.changed_personas.len();
    }
}
