//! Confirm Team use case
//!
//! Resolves an ambiguous team match. Statistic updates that were deferred
//! while the match was ambiguous are applied once it is confirmed.

use crate::ports::store::{self, CouncilStore};
use crate::use_cases::error::CouncilError;
use crate::use_cases::locks::CouncilLocks;
use crate::use_cases::shared::sync_funding;
use council_domain::{Decision, DomainError, EntityProfile, Proposal};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct ConfirmTeamUseCase {
    store: Arc<dyn CouncilStore>,
    locks: Arc<CouncilLocks>,
}

impl ConfirmTeamUseCase {
    pub fn new(store: Arc<dyn CouncilStore>, locks: Arc<CouncilLocks>) -> Self {
        Self { store, locks }
    }

    /// Link the proposal to `profile_id`, or to a new profile when `None`
    pub async fn execute(
        &self,
        proposal_id: &str,
        profile_id: Option<&str>,
    ) -> Result<Proposal, CouncilError> {
        let store = self.store.as_ref();
        let mut proposal: Proposal = store::require(store, proposal_id).await?;
        let (Some(team_match), Some(details)) = (proposal.team_match.as_mut(), proposal.details.as_ref())
        else {
            return Err(DomainError::transition("team match", "unparsed", "confirmed").into());
        };
        if !team_match.is_ambiguous() {
            return Err(DomainError::transition("team match", "resolved", "confirmed").into());
        }

        let profile = {
            let _registry = self.locks.registry.lock().await;
            match profile_id {
                Some(id) => {
                    let _team = self.locks.teams.lock(id).await;
                    let mut profile: EntityProfile = store::load(store, id)
                        .await?
                        .ok_or_else(|| CouncilError::not_found("team", id))?;
                    if profile.absorb(details, &proposal.id) {
                        store::save(store, &profile).await?;
                    }
                    team_match.confirm(id);
                    profile
                }
                None => {
                    let profile = EntityProfile::from_details(details, &proposal.id);
                    store::save(store, &profile).await?;
                    team_match.confirm(profile.id.clone());
                    team_match.created_profile = true;
                    profile
                }
            }
        };
        proposal.updated_at = chrono::Utc::now();
        store::save(store, &proposal).await?;
        info!("Confirmed team {} for proposal {}", profile.canonical_name, proposal.id);

        // The link is already persisted; funding statistics trail it
        if let Some(decision) = store::load::<Decision>(store, &proposal.id).await?
            && let Err(e) = sync_funding(store, &self.locks, &proposal, decision.status).await
        {
            warn!("Could not update team funding for {}: {}", proposal.id, e);
        }
        Ok(proposal)
    }
}
