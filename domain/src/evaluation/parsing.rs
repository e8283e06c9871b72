//! Evaluation response parsing.
//!
//! Personas answer with `SCORE:` / `RECOMMENDATION:` / `CONFIDENCE:` /
//! `RATIONALE:` / `STRENGTHS:` / `CONCERNS:` / `QUESTIONS:` sections.
//! Parsing is tolerant: a missing or unreadable field gets a documented
//! default and is reported in `missing`, so the evaluation can be flagged
//! degraded instead of discarded.
//!
//! | Field | Default when missing |
//! |-------|----------------------|
//! | score | 5 (neutral) |
//! | recommendation | `lean_reject` (conservative) |
//! | confidence | `medium` |
//! | rationale | empty |
//! | lists | empty |

use super::entities::{Evaluation, MAX_SCORE, MIN_SCORE, NEUTRAL_SCORE};
use super::recommendation::{Confidence, Recommendation};
use crate::core::error::DomainError;
use crate::core::sections::{Sections, first_number};
use crate::persona::PersonaConfig;

const LABELS: &[&str] = &[
    "SCORE",
    "RECOMMENDATION",
    "CONFIDENCE",
    "RATIONALE",
    "STRENGTHS",
    "CONCERNS",
    "QUESTIONS",
];

/// Fields recovered from one evaluation response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedEvaluation {
    pub score: Option<f64>,
    pub recommendation: Option<Recommendation>,
    pub confidence: Option<Confidence>,
    pub rationale: Option<String>,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub questions: Vec<String>,
}

impl ParsedEvaluation {
    /// Names of the scalar fields that could not be recovered
    pub fn missing(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.score.is_none() {
            missing.push("score".to_string());
        }
        if self.recommendation.is_none() {
            missing.push("recommendation".to_string());
        }
        if self.confidence.is_none() {
            missing.push("confidence".to_string());
        }
        if self.rationale.is_none() {
            missing.push("rationale".to_string());
        }
        missing
    }

    fn is_empty(&self) -> bool {
        self.score.is_none()
            && self.recommendation.is_none()
            && self.confidence.is_none()
            && self.rationale.is_none()
            && self.strengths.is_empty()
            && self.concerns.is_empty()
            && self.questions.is_empty()
    }

    /// Materialize an [`Evaluation`], defaulting whatever is missing
    pub fn into_evaluation(self, proposal_id: &str, persona: &PersonaConfig) -> Evaluation {
        let missing = self.missing();
        let mut evaluation = Evaluation::new(
            proposal_id,
            persona,
            self.score.unwrap_or(NEUTRAL_SCORE),
            self.recommendation.unwrap_or(Recommendation::LeanReject),
            self.confidence.unwrap_or(Confidence::Medium),
            self.rationale.unwrap_or_default(),
        );
        evaluation.strengths = self.strengths;
        evaluation.concerns = self.concerns;
        evaluation.questions = self.questions;
        evaluation.degraded = !missing.is_empty();
        evaluation.missing_fields = missing;
        evaluation
    }
}

/// Parse an evaluation response.
///
/// Returns an error only when nothing at all could be recovered, which
/// the evaluation stage treats as a malformed response.
pub fn parse_evaluation_response(text: &str) -> Result<ParsedEvaluation, DomainError> {
    let sections = Sections::parse(text, LABELS);

    let parsed = ParsedEvaluation {
        score: sections
            .get("SCORE")
            .and_then(first_number)
            .map(|s| s.clamp(MIN_SCORE, MAX_SCORE)),
        recommendation: sections
            .get("RECOMMENDATION")
            .and_then(Recommendation::parse_tolerant),
        confidence: sections
            .get("CONFIDENCE")
            .and_then(Confidence::parse_tolerant),
        rationale: sections.get("RATIONALE").map(str::to_string),
        strengths: sections.list("STRENGTHS"),
        concerns: sections.list("CONCERNS"),
        questions: sections.list("QUESTIONS"),
    };

    if parsed.is_empty() {
        return Err(DomainError::Extraction(
            "response contained no recognizable evaluation fields".to_string(),
        ));
    }
    Ok(parsed)
}
