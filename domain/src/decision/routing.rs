//! Routing policy
//!
//! Rules are evaluated in order:
//!
//! 1. Unanimous, consensus ≥ auto-approve threshold, amount below the
//!    human-review amount, approve side → `auto_approved`
//! 2. Unanimous, consensus ≥ auto-reject threshold, amount below the
//!    human-review amount, reject side → `auto_rejected`
//! 3. Otherwise → `needs_review`, naming the rule that blocked
//!    auto-execution
//!
//! The amount rule applies even at a consensus of 1.0. A team match still
//! awaiting confirmation also blocks auto-execution. Fallback votes count
//! like any other vote.

use super::consensus::ConsensusOutcome;
use super::entities::DecisionStatus;
use crate::evaluation::Side;
use serde::{Deserialize, Serialize};

/// Routing thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutingThresholds {
    pub auto_approve_consensus: f64,
    pub auto_reject_consensus: f64,
    /// Requests at or above this amount always go to a human
    pub human_review_amount: f64,
}

impl Default for RoutingThresholds {
    fn default() -> Self {
        Self {
            auto_approve_consensus: 0.85,
            auto_reject_consensus: 0.85,
            human_review_amount: 50_000.0,
        }
    }
}

/// Facts about the proposal that routing needs besides the votes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RoutingContext {
    pub requested_amount: f64,
    /// The team match is ambiguous and not yet confirmed
    pub team_unconfirmed: bool,
}

/// Which rule produced the routing outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingRule {
    AutoApprove,
    AutoReject,
    AmountThreshold,
    UnconfirmedTeam,
    SplitDecision,
    ModerateConsensus,
}

impl RoutingRule {
    pub fn as_str(&self) -> &str {
        match self {
            RoutingRule::AutoApprove => "auto_approve",
            RoutingRule::AutoReject => "auto_reject",
            RoutingRule::AmountThreshold => "amount_threshold",
            RoutingRule::UnconfirmedTeam => "unconfirmed_team",
            RoutingRule::SplitDecision => "split_decision",
            RoutingRule::ModerateConsensus => "moderate_consensus",
        }
    }
}

/// Result of applying the routing policy (Value Object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingOutcome {
    pub status: DecisionStatus,
    pub auto_executed: bool,
    pub rule: RoutingRule,
    pub reason: String,
}

impl RoutingOutcome {
    fn review(rule: RoutingRule, reason: String) -> Self {
        Self {
            status: DecisionStatus::NeedsReview,
            auto_executed: false,
            rule,
            reason,
        }
    }
}

/// Apply the routing policy. Deterministic in its inputs.
pub fn route(
    consensus: &ConsensusOutcome,
    context: &RoutingContext,
    thresholds: &RoutingThresholds,
) -> RoutingOutcome {
    let below_amount = context.requested_amount < thresholds.human_review_amount;
    if consensus.unanimous && below_amount && !context.team_unconfirmed {
        match consensus.primary_side {
            Side::Approve if consensus.consensus_strength >= thresholds.auto_approve_consensus => {
                return RoutingOutcome {
                    status: DecisionStatus::AutoApproved,
                    auto_executed: true,
                    rule: RoutingRule::AutoApprove,
                    reason: format!(
                        "Unanimous approval at {:.0}% consensus",
                        consensus.consensus_strength * 100.0
                    ),
                };
            }
            Side::Reject if consensus.consensus_strength >= thresholds.auto_reject_consensus => {
                return RoutingOutcome {
                    status: DecisionStatus::AutoRejected,
                    auto_executed: true,
                    rule: RoutingRule::AutoReject,
                    reason: format!(
                        "Unanimous rejection at {:.0}% consensus",
                        consensus.consensus_strength * 100.0
                    ),
                };
            }
            _ => {}
        }
    }

    if !below_amount {
        return RoutingOutcome::review(
            RoutingRule::AmountThreshold,
            format!(
                "Requested amount {:.2} meets the human review threshold of {:.2}",
                context.requested_amount, thresholds.human_review_amount
            ),
        );
    }
    if context.team_unconfirmed {
        return RoutingOutcome::review(
            RoutingRule::UnconfirmedTeam,
            "Team match is ambiguous and awaits confirmation".to_string(),
        );
    }
    if !consensus.unanimous {
        return RoutingOutcome::review(
            RoutingRule::SplitDecision,
            format!(
                "Split decision ({} approve / {} reject) requires human judgment",
                consensus.approve_count, consensus.reject_count
            ),
        );
    }
    RoutingOutcome::review(
        RoutingRule::ModerateConsensus,
        format!(
            "Consensus {:.0}% is below the auto-execution threshold",
            consensus.consensus_strength * 100.0
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::consensus::Vote;
    use crate::evaluation::{Confidence, Recommendation};

    fn consensus(recs: &[Recommendation]) -> ConsensusOutcome {
        let votes: Vec<Vote> = recs
            .iter()
            .map(|r| Vote {
                persona_id: "p".into(),
                persona_name: "P".into(),
                recommendation: *r,
                confidence: Confidence::High,
                score: 8.0,
                rationale: String::new(),
                fallback: false,
            })
            .collect();
        ConsensusOutcome::from_votes(&votes)
    }

    fn context(amount: f64) -> RoutingContext {
        RoutingContext {
            requested_amount: amount,
            ..Default::default()
        }
    }

    #[test]
    fn test_small_unanimous_approval_auto_approves() {
        let outcome = route(
            &consensus(&[Recommendation::Approve; 4]),
            &context(10_000.0),
            &RoutingThresholds::default(),
        );
        assert_eq!(outcome.status, DecisionStatus::AutoApproved);
        assert!(outcome.auto_executed);
    }

    #[test]
    fn test_single_dissent_needs_review_regardless_of_amount() {
        let recs = [
            Recommendation::Approve,
            Recommendation::Approve,
            Recommendation::Approve,
            Recommendation::Reject,
        ];
        let outcome = route(&consensus(&recs), &context(10_000.0), &RoutingThresholds::default());
        assert_eq!(outcome.status, DecisionStatus::NeedsReview);
        assert_eq!(outcome.rule, RoutingRule::SplitDecision);
        assert!(!outcome.auto_executed);
    }

    #[test]
    fn test_amount_threshold_overrides_full_consensus() {
        let outcome = route(
            &consensus(&[Recommendation::Approve; 4]),
            &context(120_000.0),
            &RoutingThresholds::default(),
        );
        assert_eq!(outcome.status, DecisionStatus::NeedsReview);
        assert_eq!(outcome.rule, RoutingRule::AmountThreshold);
    }

    #[test]
    fn test_amount_equal_to_threshold_needs_review() {
        let outcome = route(
            &consensus(&[Recommendation::Approve; 4]),
            &context(50_000.0),
            &RoutingThresholds::default(),
        );
        assert_eq!(outcome.rule, RoutingRule::AmountThreshold);
    }

    #[test]
    fn test_unanimous_rejection_auto_rejects() {
        let recs = [
            Recommendation::Reject,
            Recommendation::StrongReject,
            Recommendation::LeanReject,
        ];
        let outcome = route(&consensus(&recs), &context(5_000.0), &RoutingThresholds::default());
        assert_eq!(outcome.status, DecisionStatus::AutoRejected);
        assert!(outcome.auto_executed);
    }

    #[test]
    fn test_unconfirmed_team_blocks_auto_execution() {
        let unanimous = consensus(&[Recommendation::Approve; 4]);
        let mut ctx = context(1_000.0);
        ctx.team_unconfirmed = true;
        assert_eq!(
            route(&unanimous, &ctx, &RoutingThresholds::default()).rule,
            RoutingRule::UnconfirmedTeam
        );
    }

    #[test]
    fn test_fallback_vote_counts_toward_unanimous_rejection() {
        let mut votes: Vec<Vote> = [Recommendation::Reject; 3]
            .iter()
            .map(|r| Vote {
                persona_id: "p".into(),
                persona_name: "P".into(),
                recommendation: *r,
                confidence: Confidence::High,
                score: 3.0,
                rationale: String::new(),
                fallback: false,
            })
            .collect();
        votes.push(Vote {
            persona_id: "budget".into(),
            persona_name: "Budget".into(),
            recommendation: Recommendation::LeanReject,
            confidence: Confidence::Low,
            score: 5.0,
            rationale: "transport: connection reset".into(),
            fallback: true,
        });
        let consensus = ConsensusOutcome::from_votes(&votes);
        assert!(consensus.unanimous);

        let outcome = route(&consensus, &context(10_000.0), &RoutingThresholds::default());
        assert_eq!(outcome.status, DecisionStatus::AutoRejected);
        assert_eq!(outcome.rule, RoutingRule::AutoReject);
    }

    #[test]
    fn test_unanimous_below_consensus_threshold_is_moderate() {
        let thresholds = RoutingThresholds {
            auto_approve_consensus: 1.1,
            ..Default::default()
        };
        let outcome = route(&consensus(&[Recommendation::Approve; 4]), &context(1.0), &thresholds);
        assert_eq!(outcome.rule, RoutingRule::ModerateConsensus);
    }

    #[test]
    fn test_routing_is_deterministic() {
        let c = consensus(&[Recommendation::Approve, Recommendation::LeanReject]);
        let a = route(&c, &context(2_000.0), &RoutingThresholds::default());
        let b = route(&c, &context(2_000.0), &RoutingThresholds::default());
        assert_eq!(a, b);
    }
}
