//! Similar past proposals for evaluation context
//!
//! Similarity is tag overlap between extractions. A vector-similarity
//! backend could replace [`rank_similar`] without touching callers.

use super::entities::Proposal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Compact view of a decided past proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarProposal {
    pub proposal_id: String,
    pub title: String,
    pub requested_amount: f64,
    pub summary: String,
    pub tags: Vec<String>,
    /// Final decision status, e.g. `human_approved`
    pub decision: String,
    /// Recorded outcome, e.g. `success`
    pub outcome: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SimilarProposal {
    pub fn from_proposal(
        proposal: &Proposal,
        decision: impl Into<String>,
        outcome: Option<String>,
    ) -> Self {
        let summary = proposal
            .details
            .as_ref()
            .map(|d| d.summary.clone())
            .unwrap_or_default();
        Self {
            proposal_id: proposal.id.clone(),
            title: proposal.title().to_string(),
            requested_amount: proposal.requested_amount(),
            summary,
            tags: proposal.tags.clone(),
            decision: decision.into(),
            outcome,
            created_at: proposal.created_at,
        }
    }

    fn overlap(&self, tags: &[String]) -> usize {
        self.tags.iter().filter(|t| tags.contains(t)).count()
    }
}

/// Up to `limit` candidates sharing at least one tag, most overlap first,
/// newest first among equals. `exclude_id` is never returned.
pub fn rank_similar(
    candidates: Vec<SimilarProposal>,
    tags: &[String],
    exclude_id: &str,
    limit: usize,
) -> Vec<SimilarProposal> {
    let mut ranked: Vec<(usize, SimilarProposal)> = candidates
        .into_iter()
        .filter(|c| c.proposal_id != exclude_id)
        .map(|c| (c.overlap(tags), c))
        .filter(|(overlap, _)| *overlap > 0)
        .collect();
    ranked.sort_by(|(a, x), (b, y)| b.cmp(a).then(y.created_at.cmp(&x.created_at)));
    ranked.into_iter().take(limit).map(|(_, c)| c).collect()
}
