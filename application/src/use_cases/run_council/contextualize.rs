//! Stage 1: structured extraction and team matching

use super::RunCouncilUseCase;
use super::types::{Contextualized, RunCouncilError};
use crate::ports::progress::ProgressNotifier;
use crate::ports::store::{self, RecordFilter};
use crate::ports::text_generator::TextGenerator;
use crate::ports::transcript_logger::TranscriptEvent;
use crate::use_cases::shared::{Purpose, generate_logged};
use council_domain::proposal::parse_details;
use council_domain::{
    DomainError, EntityMatch, EntityProfile, MatchTier, PromptTemplate, Proposal, ProposalDetails,
    ProposalStatus, Stage, match_entity,
};
use serde_json::json;
use tracing::{debug, info, warn};

impl<G: TextGenerator + 'static> RunCouncilUseCase<G> {
    pub(super) async fn contextualize(
        &self,
        mut proposal: Proposal,
        progress: &dyn ProgressNotifier,
    ) -> Result<Contextualized, RunCouncilError> {
        let stage = Stage::Contextualize;
        progress.on_stage_start(stage, 1);

        let details = self.extract_details(&proposal).await?;
        let warnings = details
            .validate()
            .into_result()
            .map_err(RunCouncilError::InvalidProposal)?;
        for warning in &warnings {
            warn!("Proposal {}: {}", proposal.id, warning);
        }

        let (team_match, team) = self.link_team(&details, &proposal.id).await?;

        proposal.tags = details.tags();
        proposal.warnings = warnings;
        proposal.team_match = Some(team_match);
        proposal.details = Some(details);
        proposal.set_status(ProposalStatus::Parsed);
        store::save(self.store.as_ref(), &proposal)
            .await
            .map_err(RunCouncilError::store(stage))?;

        info!(
            "Parsed proposal {} ('{}'), team: {}",
            proposal.id,
            proposal.title(),
            proposal.team_id().unwrap_or("unconfirmed")
        );
        self.transcript.log(TranscriptEvent::new(
            "proposal_parsed",
            json!({
                "proposal_id": proposal.id,
                "title": proposal.title(),
                "tags": proposal.tags,
                "warnings": proposal.warnings,
                "team_match": proposal.team_match,
            }),
        ));

        progress.on_task_complete(stage, &self.config.parser.id, true);
        progress.on_stage_complete(stage);
        Ok(Contextualized { proposal, team })
    }

    /// Structured details from a JSON submission, or from the parser persona
    async fn extract_details(
        &self,
        proposal: &Proposal,
    ) -> Result<ProposalDetails, RunCouncilError> {
        let content = proposal.raw_content.trim();
        if content.is_empty() {
            return Err(RunCouncilError::InvalidProposal(DomainError::InvalidProposal(
                vec!["submission is empty".to_string()],
            )));
        }

        // Well-formed JSON is the extraction itself; a field it cannot supply is fatal
        if content.starts_with('{') && serde_json::from_str::<serde_json::Value>(content).is_ok() {
            debug!("Proposal {} submitted as structured JSON", proposal.id);
            return parse_details(content).map_err(RunCouncilError::InvalidProposal);
        }

        let parser = &self.config.parser;
        let response = generate_logged(
            self.generator.as_ref(),
            self.transcript.as_ref(),
            parser,
            &PromptTemplate::extraction(content),
            self.config.timeout_for(parser),
            &proposal.id,
            Purpose::new("extraction"),
        )
        .await
        .map_err(|e| RunCouncilError::StageFailed {
            stage: Stage::Contextualize,
            reason: format!("extraction request failed: {}", e),
        })?;

        parse_details(&response).map_err(RunCouncilError::InvalidProposal)
    }

    /// Match the proposal to a team, creating or updating the profile.
    ///
    /// The registry lock is held across matching and creation so two
    /// concurrent first-time submissions from the same team produce a
    /// single profile.
    async fn link_team(
        &self,
        details: &ProposalDetails,
        proposal_id: &str,
    ) -> Result<(EntityMatch, Option<EntityProfile>), RunCouncilError> {
        let stage = Stage::Contextualize;
        let _registry = self.locks.registry.lock().await;

        let profiles: Vec<EntityProfile> = store::load_all(self.store.as_ref(), &RecordFilter::all())
            .await
            .map_err(RunCouncilError::store(stage))?;
        let result = match_entity(details, &profiles, &self.config.matching);

        if result.tier == MatchTier::None {
            let profile = EntityProfile::from_details(details, proposal_id);
            store::save(self.store.as_ref(), &profile)
                .await
                .map_err(RunCouncilError::store(stage))?;
            info!("Created team profile {} for '{}'", profile.id, profile.canonical_name);
            let result = result.with_created_profile(profile.id.clone());
            return Ok((result, Some(profile)));
        }

        let Some(team_id) = result.linked_profile_id().map(str::to_string) else {
            warn!(
                "Ambiguous team match ({}): {} candidates, confirmation required",
                result.matched_on,
                result.candidates.len()
            );
            return Ok((result, None));
        };

        let _team = self.locks.teams.lock(&team_id).await;
        let mut profile: EntityProfile = store::require(self.store.as_ref(), &team_id)
            .await
            .map_err(RunCouncilError::store(stage))?;
        if profile.absorb(details, proposal_id) {
            store::save(self.store.as_ref(), &profile)
                .await
                .map_err(RunCouncilError::store(stage))?;
        }
        info!(
            "Linked proposal {} to team {} ({}, {})",
            proposal_id,
            profile.canonical_name,
            result.tier,
            result.tier.confidence_label()
        );
        Ok((result, Some(profile)))
    }
}
