//! Record Outcome use case

use crate::ports::store::{self, CouncilStore};
use crate::use_cases::error::CouncilError;
use crate::use_cases::locks::CouncilLocks;
use crate::use_cases::shared::update_team;
use council_domain::{Decision, LearningEvent, LearningTrigger, Outcome, Proposal};
use std::sync::Arc;
use tracing::{debug, info};

/// Use case for recording the real-world outcome of a decided proposal.
///
/// Updates the linked team's statistics and queues an outcome
/// [`LearningEvent`] for reflection.
#[derive(Clone)]
pub struct RecordOutcomeUseCase {
    store: Arc<dyn CouncilStore>,
    locks: Arc<CouncilLocks>,
}

impl RecordOutcomeUseCase {
    pub fn new(store: Arc<dyn CouncilStore>, locks: Arc<CouncilLocks>) -> Self {
        Self { store, locks }
    }

    pub async fn execute(
        &self,
        proposal_id: &str,
        outcome: Outcome,
    ) -> Result<LearningEvent, CouncilError> {
        outcome.validate()?;
        let store = self.store.as_ref();

        if store::load::<Decision>(store, proposal_id).await?.is_none() {
            return Err(CouncilError::not_found("decision", proposal_id));
        }
        let proposal: Proposal = store::require(store, proposal_id).await?;

        match proposal.team_id() {
            Some(team_id) => {
                let result = outcome.result;
                update_team(store, &self.locks, team_id, |p| p.record_outcome(proposal_id, result))
                    .await?;
            }
            None => debug!("Proposal {} has no confirmed team; outcome not attributed", proposal_id),
        }

        let result = outcome.result;
        let event = LearningEvent::new(proposal_id, LearningTrigger::Outcome { outcome });
        store::insert(store, &event).await?;
        info!("Recorded {} outcome for proposal {}", result, proposal_id);
        Ok(event)
    }
}
