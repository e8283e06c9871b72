//! Evaluation entities

use super::recommendation::{Confidence, Recommendation, Side};
use crate::persona::PersonaConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Score bounds of the evaluation scale
pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 10.0;
/// Neutral score used for defaults and fallbacks
pub const NEUTRAL_SCORE: f64 = 5.0;

/// Direction a persona moved during deliberation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionChange {
    #[default]
    Unchanged,
    MoreFavorable,
    MoreCritical,
}

impl PositionChange {
    pub fn as_str(&self) -> &str {
        match self {
            PositionChange::Unchanged => "unchanged",
            PositionChange::MoreFavorable => "more_favorable",
            PositionChange::MoreCritical => "more_critical",
        }
    }

    pub fn is_changed(&self) -> bool {
        !matches!(self, PositionChange::Unchanged)
    }
}

impl std::fmt::Display for PositionChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Score and recommendation at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stance {
    pub score: f64,
    pub recommendation: Recommendation,
}

impl Stance {
    /// Direction of `self` relative to `earlier`.
    ///
    /// The recommendation scale is compared first; the score only breaks
    /// ties between identical recommendations.
    pub fn change_from(&self, earlier: &Stance) -> PositionChange {
        use std::cmp::Ordering;
        let by_recommendation = self
            .recommendation
            .ordinal()
            .cmp(&earlier.recommendation.ordinal());
        let ordering = match by_recommendation {
            Ordering::Equal => self
                .score
                .partial_cmp(&earlier.score)
                .unwrap_or(Ordering::Equal),
            other => other,
        };
        match ordering {
            Ordering::Greater => PositionChange::MoreFavorable,
            Ordering::Less => PositionChange::MoreCritical,
            Ordering::Equal => PositionChange::Unchanged,
        }
    }
}

/// Revision a persona made in one deliberation round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub round: u32,
    pub before: Stance,
    pub after: Stance,
    pub justification: String,
}

/// One persona's assessment of one proposal (Entity)
///
/// Created in Stage 2 and revised in place by Stage 3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: String,
    pub proposal_id: String,
    pub persona_id: String,
    pub persona_name: String,
    /// Text-generation target that produced this evaluation
    pub model: String,
    pub score: f64,
    pub recommendation: Recommendation,
    pub confidence: Confidence,
    pub rationale: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub questions: Vec<String>,
    /// Some fields could not be parsed and were defaulted
    #[serde(default)]
    pub degraded: bool,
    #[serde(default)]
    pub missing_fields: Vec<String>,
    /// Set when the persona call failed and this is a neutral fallback
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// Stance produced in Stage 2, before any deliberation
    pub original: Stance,
    #[serde(default)]
    pub position_changed: PositionChange,
    #[serde(default)]
    pub revisions: Vec<Revision>,
    /// Observations included in the evaluation prompt
    #[serde(default)]
    pub observation_ids: Vec<String>,
    /// Similar past proposals included in the evaluation prompt
    #[serde(default)]
    pub similar_proposal_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Evaluation {
    /// Build an evaluation from parsed fields
    pub fn new(
        proposal_id: impl Into<String>,
        persona: &PersonaConfig,
        score: f64,
        recommendation: Recommendation,
        confidence: Confidence,
        rationale: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let score = score.clamp(MIN_SCORE, MAX_SCORE);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            proposal_id: proposal_id.into(),
            persona_id: persona.id.clone(),
            persona_name: persona.name.clone(),
            model: persona.model.clone(),
            score,
            recommendation,
            confidence,
            rationale: rationale.into(),
            strengths: Vec::new(),
            concerns: Vec::new(),
            questions: Vec::new(),
            degraded: false,
            missing_fields: Vec::new(),
            failure_reason: None,
            original: Stance {
                score,
                recommendation,
            },
            position_changed: PositionChange::Unchanged,
            revisions: Vec::new(),
            observation_ids: Vec::new(),
            similar_proposal_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Neutral contribution of a persona whose call failed
    pub fn fallback(
        proposal_id: impl Into<String>,
        persona: &PersonaConfig,
        reason: impl Into<String>,
    ) -> Self {
        let mut evaluation = Self::new(
            proposal_id,
            persona,
            NEUTRAL_SCORE,
            Recommendation::LeanReject,
            Confidence::Low,
            "Reviewer did not provide an evaluation",
        );
        evaluation.failure_reason = Some(reason.into());
        evaluation
    }

    pub fn is_fallback(&self) -> bool {
        self.failure_reason.is_some()
    }

    pub fn side(&self) -> Side {
        self.recommendation.side()
    }

    pub fn stance(&self) -> Stance {
        Stance {
            score: self.score,
            recommendation: self.recommendation,
        }
    }

    /// Apply a deliberation-round revision in place.
    ///
    /// `position_changed` always reflects the net change against the
    /// original Stage-2 stance, so a persona that moves and then moves back
    /// ends up `Unchanged`.
    pub fn revise(
        &mut self,
        round: u32,
        score: Option<f64>,
        recommendation: Option<Recommendation>,
        justification: impl Into<String>,
    ) {
        let before = self.stance();
        if let Some(score) = score {
            self.score = score.clamp(MIN_SCORE, MAX_SCORE);
        }
        if let Some(recommendation) = recommendation {
            self.recommendation = recommendation;
        }
        let after = self.stance();
        self.revisions.push(Revision {
            round,
            before,
            after,
            justification: justification.into(),
        });
        self.position_changed = after.change_from(&self.original);
        self.updated_at = Utc::now();
    }
}

/// All evaluations of one proposal, stored as a single record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSet {
    pub proposal_id: String,
    pub evaluations: Vec<Evaluation>,
    pub updated_at: DateTime<Utc>,
}

impl EvaluationSet {
    pub fn new(proposal_id: impl Into<String>, evaluations: Vec<Evaluation>) -> Self {
        Self {
            proposal_id: proposal_id.into(),
            evaluations,
            updated_at: Utc::now(),
        }
    }

    pub fn for_persona(&self, persona_id: &str) -> Option<&Evaluation> {
        self.evaluations.iter().find(|e| e.persona_id == persona_id)
    }

    /// Evaluations that came from a real persona response
    pub fn real(&self) -> impl Iterator<Item = &Evaluation> {
        self.evaluations.iter().filter(|e| !e.is_fallback())
    }
}
