//! Learning events and their processing receipts

use super::outcome::Outcome;
use crate::evaluation::{Recommendation, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What caused a learning event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LearningTrigger {
    /// A human ruled against the panel's primary recommendation
    Override {
        human_verdict: Side,
        panel_recommendation: Recommendation,
        rationale: String,
    },
    /// A real-world outcome was recorded
    Outcome { outcome: Outcome },
}

impl LearningTrigger {
    pub fn as_str(&self) -> &str {
        match self {
            LearningTrigger::Override { .. } => "override",
            LearningTrigger::Outcome { .. } => "outcome",
        }
    }
}

/// Feedback signal about one proposal (Entity, immutable after creation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEvent {
    pub id: String,
    pub proposal_id: String,
    pub trigger: LearningTrigger,
    pub created_at: DateTime<Utc>,
}

impl LearningEvent {
    pub fn new(proposal_id: impl Into<String>, trigger: LearningTrigger) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            proposal_id: proposal_id.into(),
            trigger,
            created_at: Utc::now(),
        }
    }

    /// Replace the generated id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn kind(&self) -> &str {
        self.trigger.as_str()
    }
}

/// Record that a learning event was processed, keyed by the event id
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LearningReceipt {
    pub event_id: String,
    pub proposal_id: String,
    /// Personas that returned a reflection
    pub reflections: usize,
    /// Draft observations created
    pub created: Vec<String>,
    /// Existing observations that gained validating evidence
    pub reinforced: Vec<String>,
    /// Existing observations that gained invalidating evidence
    pub contradicted: Vec<String>,
    /// Persona reflections that failed, as "persona: reason"
    pub failures: Vec<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl LearningReceipt {
    pub fn new(event: &LearningEvent) -> Self {
        Self {
            event_id: event.id.clone(),
            proposal_id: event.proposal_id.clone(),
            ..Default::default()
        }
    }

    pub fn finish(mut self) -> Self {
        self.processed_at = Some(Utc::now());
        self
    }

    pub fn touched(&self) -> usize {
        self.created.len() + self.reinforced.len() + self.contradicted.len()
    }
}
