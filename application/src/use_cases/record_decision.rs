//! Record Decision use case
//!
//! Applies the single human ruling a decision accepts. A ruling against the
//! panel's primary side also creates an override [`LearningEvent`].

use crate::ports::store::{self, CouncilStore};
use crate::ports::transcript_logger::{NoTranscriptLogger, TranscriptEvent, TranscriptLogger};
use crate::use_cases::error::CouncilError;
use crate::use_cases::locks::CouncilLocks;
use crate::use_cases::shared::sync_funding;
use council_domain::{Decision, LearningEvent, LearningTrigger, Proposal, Side};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Input for the RecordDecision use case
#[derive(Debug, Clone)]
pub struct RecordDecisionInput {
    pub proposal_id: String,
    pub verdict: Side,
    pub notes: String,
}

impl RecordDecisionInput {
    pub fn new(proposal_id: impl Into<String>, verdict: Side) -> Self {
        Self {
            proposal_id: proposal_id.into(),
            verdict,
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordDecisionOutput {
    pub decision: Decision,
    /// Set when the ruling overrode the panel
    pub learning_event: Option<LearningEvent>,
}

impl RecordDecisionOutput {
    pub fn is_override(&self) -> bool {
        self.learning_event.is_some()
    }
}

/// Use case for recording a human decision
#[derive(Clone)]
pub struct RecordDecisionUseCase {
    store: Arc<dyn CouncilStore>,
    transcript: Arc<dyn TranscriptLogger>,
    locks: Arc<CouncilLocks>,
}

impl RecordDecisionUseCase {
    pub fn new(store: Arc<dyn CouncilStore>, locks: Arc<CouncilLocks>) -> Self {
        Self {
            store,
            transcript: Arc::new(NoTranscriptLogger),
            locks,
        }
    }

    pub fn with_transcript_logger(mut self, transcript: Arc<dyn TranscriptLogger>) -> Self {
        self.transcript = transcript;
        self
    }

    pub async fn execute(
        &self,
        input: RecordDecisionInput,
    ) -> Result<RecordDecisionOutput, CouncilError> {
        let store = self.store.as_ref();
        let _guard = self.locks.decisions.lock(&input.proposal_id).await;

        let mut decision: Decision = store::load(store, &input.proposal_id)
            .await?
            .ok_or_else(|| CouncilError::not_found("decision", &input.proposal_id))?;
        let proposal: Proposal = store::require(store, &input.proposal_id).await?;

        let overrides = decision.record_human(input.verdict, input.notes.clone())?;

        // Override event first, under a per-proposal id; the decision write follows
        let learning_event = if overrides {
            let event = LearningEvent::new(
                &proposal.id,
                LearningTrigger::Override {
                    human_verdict: input.verdict,
                    panel_recommendation: decision.primary_recommendation,
                    rationale: input.notes.clone(),
                },
            )
            .with_id(format!("override-{}", proposal.id));
            store::save(store, &event).await?;
            Some(event)
        } else {
            None
        };

        store::save(store, &decision).await?;
        info!(
            "Human {} proposal {}{}",
            match input.verdict {
                Side::Approve => "approved",
                Side::Reject => "rejected",
            },
            proposal.id,
            if overrides { " (override)" } else { "" }
        );
        if let Some(event) = &learning_event {
            info!("Queued override learning event {}", event.id);
        }
        self.transcript.log(TranscriptEvent::new(
            "human_decision",
            json!({
                "proposal_id": proposal.id,
                "verdict": input.verdict.as_str(),
                "status": decision.status.as_str(),
                "override": overrides,
                "notes": input.notes,
            }),
        ));

        if let Err(e) = sync_funding(store, &self.locks, &proposal, decision.status).await {
            warn!("Could not update team funding for {}: {}", proposal.id, e);
        }

        Ok(RecordDecisionOutput {
            decision,
            learning_event,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ports::store::{self, Collection};
    use crate::use_cases::testing::{council, proposal_json, unanimous};
    use council_domain::{
        DecisionStatus, EntityProfile, LearningTrigger, Recommendation, Side,
    };

    #[tokio::test]
    async fn test_override_creates_learning_event() {
        let (council, _, store) = council(unanimous(8, "APPROVE"));
        let output = council
            .submit(proposal_json("Bridge", "Acme Labs", 75_000.0, "0xABC"))
            .await
            .unwrap();
        assert_eq!(output.decision.status, DecisionStatus::NeedsReview);

        let recorded = council
            .record_human_decision(&output.proposal.id, Side::Reject, "Team lacks audit experience")
            .await
            .unwrap();

        assert!(recorded.is_override());
        assert_eq!(recorded.decision.status, DecisionStatus::HumanRejected);
        let human = recorded.decision.human.as_ref().unwrap();
        assert_eq!(human.previous_status, DecisionStatus::NeedsReview);
        let event = recorded.learning_event.unwrap();
        assert_eq!(event.proposal_id, output.proposal.id);
        assert_eq!(
            event.trigger,
            LearningTrigger::Override {
                human_verdict: Side::Reject,
                panel_recommendation: Recommendation::Approve,
                rationale: "Team lacks audit experience".to_string(),
            }
        );
        let stored: council_domain::LearningEvent =
            store::require(store.as_ref(), &event.id).await.unwrap();
        assert_eq!(stored.id, event.id);
    }

    #[tokio::test]
    async fn test_second_human_decision_is_rejected() {
        let (council, _, _) = council(unanimous(8, "APPROVE"));
        let output = council
            .submit(proposal_json("Bridge", "Acme Labs", 75_000.0, "0xABC"))
            .await
            .unwrap();
        council
            .record_human_decision(&output.proposal.id, Side::Approve, "")
            .await
            .unwrap();

        let err = council
            .record_human_decision(&output.proposal.id, Side::Reject, "changed my mind")
            .await
            .unwrap_err();
        assert!(err.is_invalid_transition());

        let view = council.get_proposal(&output.proposal.id).await.unwrap();
        assert_eq!(view.decision.unwrap().status, DecisionStatus::HumanApproved);
    }

    #[tokio::test]
    async fn test_agreeing_approval_records_funding_without_event() {
        let (council, _, store) = council(unanimous(8, "APPROVE"));
        let output = council
            .submit(proposal_json("Bridge", "Acme Labs", 75_000.0, "0xABC"))
            .await
            .unwrap();

        let recorded = council
            .record_human_decision(&output.proposal.id, Side::Approve, "Looks good")
            .await
            .unwrap();

        assert!(!recorded.is_override());
        let team: EntityProfile = store::require(store.as_ref(), output.proposal.team_id().unwrap())
            .await
            .unwrap();
        assert_eq!(team.total_funding(), 75_000.0);
        assert!(council.list_learning_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejecting_auto_approval_revokes_funding() {
        let (council, _, store) = council(unanimous(8, "APPROVE"));
        let output = council
            .submit(proposal_json("Indexer", "Acme Labs", 10_000.0, "0xABC"))
            .await
            .unwrap();
        assert_eq!(output.decision.status, DecisionStatus::AutoApproved);

        let recorded = council
            .record_human_decision(&output.proposal.id, Side::Reject, "Duplicate of funded work")
            .await
            .unwrap();

        assert!(recorded.is_override());
        let team: EntityProfile = store::require(store.as_ref(), output.proposal.team_id().unwrap())
            .await
            .unwrap();
        assert_eq!(team.grants_received(), 0);
    }

    #[tokio::test]
    async fn test_unknown_proposal_is_not_found() {
        let (council, _, _) = council(unanimous(8, "APPROVE"));
        let err = council
            .record_human_decision("missing", Side::Approve, "")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_override_survives_team_write_failure() {
        let (council, _, store) = council(unanimous(3, "REJECT"));
        let output = council
            .submit(proposal_json("Bridge", "Acme Labs", 75_000.0, "0xABC"))
            .await
            .unwrap();
        assert_eq!(output.decision.status, DecisionStatus::NeedsReview);

        store.fail_writes_to(Collection::Teams);
        let recorded = council
            .record_human_decision(&output.proposal.id, Side::Approve, "Strong prior delivery")
            .await
            .unwrap();

        assert!(recorded.is_override());
        assert_eq!(recorded.decision.status, DecisionStatus::HumanApproved);
        let events = council.list_learning_events().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.proposal_id, output.proposal.id);
        let team: EntityProfile = store::require(store.as_ref(), output.proposal.team_id().unwrap())
            .await
            .unwrap();
        assert_eq!(team.grants_received(), 0);
    }

    #[tokio::test]
    async fn test_failed_decision_write_can_be_retried() {
        let (council, _, store) = council(unanimous(3, "REJECT"));
        let output = council
            .submit(proposal_json("Bridge", "Acme Labs", 75_000.0, "0xABC"))
            .await
            .unwrap();

        store.fail_writes_to(Collection::Decisions);
        let err = council
            .record_human_decision(&output.proposal.id, Side::Approve, "")
            .await
            .unwrap_err();
        assert!(!err.is_invalid_transition());
        let view = council.get_proposal(&output.proposal.id).await.unwrap();
        assert_eq!(view.decision.unwrap().status, DecisionStatus::NeedsReview);

        store.allow_writes_to(Collection::Decisions);
        let recorded = council
            .record_human_decision(&output.proposal.id, Side::Approve, "")
            .await
            .unwrap();
        assert_eq!(recorded.decision.status, DecisionStatus::HumanApproved);
        assert_eq!(store.count(Collection::LearningEvents), 1);
    }
}
