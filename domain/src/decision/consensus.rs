//! Vote aggregation
//!
//! The panel's primary side is the majority of approve-leaning versus
//! reject-leaning votes (a tie goes to reject). The primary recommendation
//! is the most frequent recommendation on that side, with ties broken
//! toward the more critical end of the scale. Consensus strength is the
//! share of votes on the primary side, which keeps it monotonic: adding a
//! vote that agrees with the majority side never lowers it.

use crate::evaluation::{Confidence, Evaluation, Recommendation, Side};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One persona's final vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub persona_id: String,
    pub persona_name: String,
    pub recommendation: Recommendation,
    pub confidence: Confidence,
    pub score: f64,
    pub rationale: String,
    /// The persona failed and this is its neutral fallback
    #[serde(default)]
    pub fallback: bool,
}

impl Vote {
    /// Final vote from a (possibly revised) evaluation
    pub fn from_evaluation(evaluation: &Evaluation) -> Self {
        let rationale = evaluation
            .revisions
            .last()
            .filter(|r| !r.justification.is_empty())
            .map(|r| r.justification.clone())
            .unwrap_or_else(|| evaluation.rationale.clone());
        Self {
            persona_id: evaluation.persona_id.clone(),
            persona_name: evaluation.persona_name.clone(),
            recommendation: evaluation.recommendation,
            confidence: evaluation.confidence,
            score: evaluation.score,
            rationale,
            fallback: evaluation.is_fallback(),
        }
    }

    pub fn side(&self) -> Side {
        self.recommendation.side()
    }
}

/// Aggregate of a set of votes (Value Object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusOutcome {
    pub primary_recommendation: Recommendation,
    pub primary_side: Side,
    /// Share of votes on the primary side, in `[0, 1]`
    pub consensus_strength: f64,
    /// Every vote is on the same side
    pub unanimous: bool,
    pub approve_count: usize,
    pub reject_count: usize,
    pub total: usize,
}

impl ConsensusOutcome {
    /// Aggregate votes. Order of `votes` does not affect the result.
    pub fn from_votes(votes: &[Vote]) -> Self {
        let total = votes.len();
        let approve_count = votes.iter().filter(|v| v.side() == Side::Approve).count();
        let reject_count = total - approve_count;

        if total == 0 {
            return Self {
                primary_recommendation: Recommendation::LeanReject,
                primary_side: Side::Reject,
                consensus_strength: 0.0,
                unanimous: false,
                approve_count,
                reject_count,
                total,
            };
        }

        let primary_side = if approve_count > reject_count {
            Side::Approve
        } else {
            Side::Reject
        };

        let mut counts: HashMap<Recommendation, usize> = HashMap::new();
        for vote in votes.iter().filter(|v| v.side() == primary_side) {
            *counts.entry(vote.recommendation).or_insert(0) += 1;
        }
        // Max count first, then the lowest ordinal (most critical)
        let primary_recommendation = counts
            .into_iter()
            .max_by(|(ra, ca), (rb, cb)| ca.cmp(cb).then(rb.ordinal().cmp(&ra.ordinal())))
            .map(|(r, _)| r)
            .unwrap_or(Recommendation::LeanReject);

        let on_side = match primary_side {
            Side::Approve => approve_count,
            Side::Reject => reject_count,
        };

        Self {
            primary_recommendation,
            primary_side,
            consensus_strength: on_side as f64 / total as f64,
            unanimous: approve_count == total || reject_count == total,
            approve_count,
            reject_count,
            total,
        }
    }
}
