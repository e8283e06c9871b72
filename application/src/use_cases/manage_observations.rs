//! Manage Observations use case
//!
//! Human curation of learned observations. Only approved (`active`)
//! observations are ever included in evaluation prompts.

use crate::ports::store::{self, CouncilStore, RecordFilter};
use crate::use_cases::error::CouncilError;
use crate::use_cases::locks::CouncilLocks;
use council_domain::{DomainError, Observation, ObservationStatus};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct ManageObservationsUseCase {
    store: Arc<dyn CouncilStore>,
    locks: Arc<CouncilLocks>,
}

impl ManageObservationsUseCase {
    pub fn new(store: Arc<dyn CouncilStore>, locks: Arc<CouncilLocks>) -> Self {
        Self { store, locks }
    }

    /// Draft or reviewed -> active
    pub async fn approve(&self, observation_id: &str) -> Result<Observation, CouncilError> {
        self.transition(observation_id, Observation::approve).await
    }

    /// Any non-deprecated status -> deprecated
    pub async fn deprecate(&self, observation_id: &str) -> Result<Observation, CouncilError> {
        self.transition(observation_id, Observation::deprecate).await
    }

    /// Observations filtered by persona and status, in id order
    pub async fn list(
        &self,
        persona_id: Option<&str>,
        status: Option<ObservationStatus>,
    ) -> Result<Vec<Observation>, CouncilError> {
        let mut filter = RecordFilter::all();
        if let Some(persona_id) = persona_id {
            filter = filter.eq("persona_id", persona_id);
        }
        if let Some(status) = status {
            filter = filter.eq("status", status.as_str());
        }
        Ok(store::load_all(self.store.as_ref(), &filter).await?)
    }

    async fn transition<F>(
        &self,
        observation_id: &str,
        apply: F,
    ) -> Result<Observation, CouncilError>
    where
        F: FnOnce(&mut Observation) -> Result<(), DomainError>,
    {
        let store = self.store.as_ref();
        let persona_id = self.load(observation_id).await?.persona_id;

        // Reload under the persona lock so concurrent learning is not lost
        let _guard = self.locks.personas.lock(&persona_id).await;
        let mut observation = self.load(observation_id).await?;
        let from = observation.status;
        apply(&mut observation)?;
        store::save(store, &observation).await?;
        info!(
            "Observation {} ({}): {} -> {}",
            observation.id, observation.persona_id, from, observation.status
        );
        Ok(observation)
    }

    async fn load(&self, observation_id: &str) -> Result<Observation, CouncilError> {
        store::load(self.store.as_ref(), observation_id)
            .await?
            .ok_or_else(|| CouncilError::not_found("observation", observation_id))
    }
}

#[cfg(test)]
mod tests {
    use crate::use_cases::testing::{PERSONAS, council, proposal_json, reflection_response, unanimous};
    use council_domain::{ObservationStatus, Side};

    const PATTERN: &str = "Teams without a maintenance plan abandon tooling";

    /// Learn one draft per persona from an override
    async fn drafted() -> (
        crate::use_cases::council::Council<crate::use_cases::testing::MockGenerator>,
        std::sync::Arc<crate::use_cases::testing::MockGenerator>,
    ) {
        let (council, generator, _) = council(unanimous(8, "APPROVE"));
        let output = council
            .submit(proposal_json("Bridge", "Acme Labs", 75_000.0, "0xABC"))
            .await
            .unwrap();
        council
            .record_human_decision(&output.proposal.id, Side::Reject, "No maintenance plan")
            .await
            .unwrap();
        for persona in PERSONAS {
            generator.push(persona, Ok(reflection_response(PATTERN, "maintenance")));
        }
        council.process_pending_learning().await.unwrap();
        (council, generator)
    }

    #[tokio::test]
    async fn test_only_approved_observations_reach_prompts() {
        let (council, generator) = drafted().await;
        let technical = council.list_observations(Some("technical"), None).await.unwrap();

        council
            .submit(proposal_json("Explorer", "Acme Labs", 10_000.0, "0xABC"))
            .await
            .unwrap();
        assert!(generator.prompts_for("technical").iter().all(|p| !p.contains(PATTERN)));

        let approved = council.approve_observation(&technical[0].id).await.unwrap();
        assert_eq!(approved.status, ObservationStatus::Active);
        council
            .submit(proposal_json("Wallet", "Acme Labs", 10_000.0, "0xABC"))
            .await
            .unwrap();

        let prompts = generator.prompts_for("technical");
        assert!(prompts.last().unwrap().contains(PATTERN));
        assert!(generator.prompts_for("budget").iter().all(|p| !p.contains(PATTERN)));
    }

    #[tokio::test]
    async fn test_deprecated_observation_cannot_be_approved() {
        let (council, _) = drafted().await;
        let budget = council.list_observations(Some("budget"), None).await.unwrap();
        let id = budget[0].id.clone();

        let deprecated = council.deprecate_observation(&id).await.unwrap();
        assert_eq!(deprecated.status, ObservationStatus::Deprecated);

        let err = council.approve_observation(&id).await.unwrap_err();
        assert!(err.is_invalid_transition());
        let err = council.deprecate_observation(&id).await.unwrap_err();
        assert!(err.is_invalid_transition());
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let (council, _) = drafted().await;
        let all = council.list_observations(None, None).await.unwrap();
        assert_eq!(all.len(), 4);

        council.approve_observation(&all[0].id).await.unwrap();
        let active = council
            .list_observations(None, Some(ObservationStatus::Active))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, all[0].id);
    }

    #[tokio::test]
    async fn test_unknown_observation_is_not_found() {
        let (council, _, _) = council(unanimous(8, "APPROVE"));
        let err = council.approve_observation("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
