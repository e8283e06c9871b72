//! Anonymized peer views for deliberation prompts.
//!
//! A persona never learns which colleague wrote which evaluation: peers are
//! copied without identity, shuffled per (proposal, persona, round), and
//! relabelled "Reviewer A", "Reviewer B", ... The underlying
//! [`Evaluation`] records keep their true persona identity.

use crate::core::string::truncate;
use crate::evaluation::{Confidence, Evaluation, Recommendation};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::hash::{DefaultHasher, Hash, Hasher};

/// Rationale excerpts shown to peers are cut to this many bytes
pub const PEER_RATIONALE_LIMIT: usize = 500;
/// Only the first concerns/strengths of each peer are shown
pub const PEER_LIST_LIMIT: usize = 3;

/// What one persona sees of one peer evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerView {
    pub label: String,
    pub score: f64,
    pub recommendation: Recommendation,
    pub confidence: Confidence,
    pub rationale: String,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
}

impl PeerView {
    fn from_evaluation(evaluation: &Evaluation) -> Self {
        Self {
            label: String::new(),
            score: evaluation.score,
            recommendation: evaluation.recommendation,
            confidence: evaluation.confidence,
            rationale: truncate(&evaluation.rationale, PEER_RATIONALE_LIMIT),
            strengths: evaluation
                .strengths
                .iter()
                .take(PEER_LIST_LIMIT)
                .cloned()
                .collect(),
            concerns: evaluation
                .concerns
                .iter()
                .take(PEER_LIST_LIMIT)
                .cloned()
                .collect(),
        }
    }
}

/// Bundle of peer views shown to `persona_id` in one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerBundle {
    pub persona_id: String,
    pub peers: Vec<PeerView>,
}

/// Build the anonymized, shuffled peer bundle for one persona.
///
/// Fallback evaluations are excluded. The order is a deterministic function
/// of `(proposal_id, persona_id, round)`, so reruns with identical inputs
/// produce identical prompts while different personas see different orders.
pub fn peer_bundle(
    evaluations: &[Evaluation],
    proposal_id: &str,
    persona_id: &str,
    round: u32,
) -> PeerBundle {
    let mut peers: Vec<PeerView> = evaluations
        .iter()
        .filter(|e| e.persona_id != persona_id && !e.is_fallback())
        .map(PeerView::from_evaluation)
        .collect();

    let mut hasher = DefaultHasher::new();
    (proposal_id, persona_id, round).hash(&mut hasher);
    let mut rng = StdRng::seed_from_u64(hasher.finish());
    peers.shuffle(&mut rng);

    for (i, peer) in peers.iter_mut().enumerate() {
        peer.label = format!("Reviewer {}", reviewer_letter(i));
    }

    PeerBundle {
        persona_id: persona_id.to_string(),
        peers,
    }
}

fn reviewer_letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}
