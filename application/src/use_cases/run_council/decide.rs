//! Stage 4: vote aggregation, routing and the decision record

use super::RunCouncilUseCase;
use super::types::{Deliberated, RunCouncilError, RunCouncilOutput};
use crate::ports::progress::ProgressNotifier;
use crate::ports::store::{self, StoreError};
use crate::ports::text_generator::TextGenerator;
use crate::ports::transcript_logger::TranscriptEvent;
use crate::use_cases::shared::sync_funding;
use council_domain::decision::summarize;
use council_domain::{
    ConsensusOutcome, Decision, ProposalStatus, RoutingContext, Stage, Vote, route,
};
use serde_json::json;
use tracing::{info, warn};

impl<G: TextGenerator + 'static> RunCouncilUseCase<G> {
    pub(super) async fn decide(
        &self,
        deliberated: Deliberated,
        progress: &dyn ProgressNotifier,
    ) -> Result<RunCouncilOutput, RunCouncilError> {
        let stage = Stage::Decide;
        progress.on_stage_start(stage, 1);

        let Deliberated {
            evaluated,
            deliberation,
        } = deliberated;
        let evaluations = evaluated.evaluations;
        let mut proposal = evaluated.context.proposal;

        let votes: Vec<Vote> = evaluations.iter().map(Vote::from_evaluation).collect();
        let consensus = ConsensusOutcome::from_votes(&votes);
        let context = RoutingContext {
            requested_amount: proposal.requested_amount(),
            team_unconfirmed: proposal
                .team_match
                .as_ref()
                .is_some_and(|m| m.is_ambiguous()),
        };
        let routing = route(&consensus, &context, &self.config.routing);

        let mut decision = Decision::new(&proposal.id, votes, &consensus, routing);
        summarize(
            &mut decision,
            proposal.title(),
            proposal.requested_amount(),
            &evaluations,
        );

        match store::insert(self.store.as_ref(), &decision).await {
            Ok(()) => {}
            Err(StoreError::AlreadyExists { .. }) => {
                return Err(RunCouncilError::StageFailed {
                    stage,
                    reason: format!("proposal {} already has a decision", proposal.id),
                });
            }
            Err(e) => return Err(RunCouncilError::Store { stage, source: e }),
        }

        info!(
            "Decision for {}: {} ({}, {:.0}% consensus)",
            proposal.id,
            decision.status,
            decision.primary_recommendation,
            decision.consensus_strength * 100.0
        );
        self.transcript.log(TranscriptEvent::new(
            "decision_recorded",
            json!({
                "proposal_id": proposal.id,
                "status": decision.status.as_str(),
                "primary_recommendation": decision.primary_recommendation.as_str(),
                "consensus_strength": decision.consensus_strength,
                "routing_rule": decision.routing_rule.as_str(),
                "routing_reason": decision.routing_reason,
            }),
        ));

        // Funding statistics trail the decision; replaying the update is a no-op
        if let Err(e) =
            sync_funding(self.store.as_ref(), &self.locks, &proposal, decision.status).await
        {
            warn!("Could not update team funding for {}: {}", proposal.id, e);
        }

        proposal.set_status(ProposalStatus::Decided);
        store::save(self.store.as_ref(), &proposal)
            .await
            .map_err(RunCouncilError::store(stage))?;

        progress.on_task_complete(stage, "council", true);
        progress.on_stage_complete(stage);
        Ok(RunCouncilOutput {
            proposal,
            evaluations,
            deliberation,
            decision,
        })
    }
}
