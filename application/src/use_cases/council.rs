//! Council facade
//!
//! One entry point that wires every use case to the same generator, store,
//! configuration and locks. Presentation layers talk to this type only.

use crate::config::CouncilConfig;
use crate::ports::progress::ProgressNotifier;
use crate::ports::store::{self, CouncilStore, RecordFilter};
use crate::ports::text_generator::TextGenerator;
use crate::ports::transcript_logger::{NoTranscriptLogger, TranscriptLogger};
use crate::use_cases::confirm_team::ConfirmTeamUseCase;
use crate::use_cases::error::CouncilError;
use crate::use_cases::learn::{LearningBatch, ProcessLearningUseCase};
use crate::use_cases::locks::CouncilLocks;
use crate::use_cases::manage_observations::ManageObservationsUseCase;
use crate::use_cases::record_decision::{
    RecordDecisionInput, RecordDecisionOutput, RecordDecisionUseCase,
};
use crate::use_cases::record_outcome::RecordOutcomeUseCase;
use crate::use_cases::run_council::{
    RunCouncilError, RunCouncilInput, RunCouncilOutput, RunCouncilUseCase,
};
use council_domain::{
    Decision, DecisionStatus, DeliberationRecord, EntityProfile, EvaluationSet, LearningEvent,
    LearningReceipt, Observation, ObservationStatus, Outcome, PipelineEvent, Proposal, Side,
};
use futures::stream::BoxStream;
use std::sync::Arc;

/// Everything stored about one proposal
#[derive(Debug, Clone)]
pub struct ProposalView {
    pub proposal: Proposal,
    pub evaluations: Option<EvaluationSet>,
    pub deliberation: Option<DeliberationRecord>,
    pub decision: Option<Decision>,
}

/// A learning event and its receipt, if processed
#[derive(Debug, Clone)]
pub struct LearningEventView {
    pub event: LearningEvent,
    pub receipt: Option<LearningReceipt>,
}

pub struct Council<G: TextGenerator + 'static> {
    run: RunCouncilUseCase<G>,
    record_decision: RecordDecisionUseCase,
    record_outcome: RecordOutcomeUseCase,
    learning: ProcessLearningUseCase<G>,
    observations: ManageObservationsUseCase,
    confirm_team: ConfirmTeamUseCase,
    store: Arc<dyn CouncilStore>,
    config: Arc<CouncilConfig>,
}

impl<G: TextGenerator + 'static> Clone for Council<G> {
    fn clone(&self) -> Self {
        Self {
            run: self.run.clone(),
            record_decision: self.record_decision.clone(),
            record_outcome: self.record_outcome.clone(),
            learning: self.learning.clone(),
            observations: self.observations.clone(),
            confirm_team: self.confirm_team.clone(),
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<G: TextGenerator + 'static> Council<G> {
    pub fn new(generator: Arc<G>, store: Arc<dyn CouncilStore>, config: CouncilConfig) -> Self {
        Self::with_transcript_logger(generator, store, config, Arc::new(NoTranscriptLogger))
    }

    pub fn with_transcript_logger(
        generator: Arc<G>,
        store: Arc<dyn CouncilStore>,
        config: CouncilConfig,
        transcript: Arc<dyn TranscriptLogger>,
    ) -> Self {
        let config = Arc::new(config);
        let locks = Arc::new(CouncilLocks::new());
        Self {
            run: RunCouncilUseCase::new(generator.clone(), store.clone(), config.clone())
                .with_transcript_logger(transcript.clone())
                .with_locks(locks.clone()),
            record_decision: RecordDecisionUseCase::new(store.clone(), locks.clone())
                .with_transcript_logger(transcript.clone()),
            record_outcome: RecordOutcomeUseCase::new(store.clone(), locks.clone()),
            learning: ProcessLearningUseCase::new(generator, store.clone(), config.clone(), locks.clone())
                .with_transcript_logger(transcript),
            observations: ManageObservationsUseCase::new(store.clone(), locks.clone()),
            confirm_team: ConfirmTeamUseCase::new(store.clone(), locks),
            store,
            config,
        }
    }

    pub fn config(&self) -> &CouncilConfig {
        &self.config
    }

    // ==================== Pipeline ====================

    pub async fn submit(
        &self,
        content: impl Into<String>,
    ) -> Result<RunCouncilOutput, RunCouncilError> {
        self.run.execute(RunCouncilInput::new(content)).await
    }

    pub async fn submit_with_progress(
        &self,
        content: impl Into<String>,
        progress: &dyn ProgressNotifier,
    ) -> Result<RunCouncilOutput, RunCouncilError> {
        self.run
            .execute_with_progress(RunCouncilInput::new(content), progress)
            .await
    }

    pub fn submit_streaming(
        &self,
        content: impl Into<String>,
    ) -> BoxStream<'static, PipelineEvent> {
        self.run.stream(RunCouncilInput::new(content))
    }

    // ==================== Feedback ====================

    pub async fn record_human_decision(
        &self,
        proposal_id: &str,
        verdict: Side,
        notes: impl Into<String>,
    ) -> Result<RecordDecisionOutput, CouncilError> {
        self.record_decision
            .execute(RecordDecisionInput::new(proposal_id, verdict).with_notes(notes))
            .await
    }

    pub async fn record_outcome(
        &self,
        proposal_id: &str,
        outcome: Outcome,
    ) -> Result<LearningEvent, CouncilError> {
        self.record_outcome.execute(proposal_id, outcome).await
    }

    pub async fn confirm_team(
        &self,
        proposal_id: &str,
        profile_id: Option<&str>,
    ) -> Result<Proposal, CouncilError> {
        self.confirm_team.execute(proposal_id, profile_id).await
    }

    // ==================== Learning ====================

    pub async fn process_pending_learning(&self) -> Result<LearningBatch, CouncilError> {
        self.learning.process_pending().await
    }

    pub async fn process_learning_event(
        &self,
        event_id: &str,
    ) -> Result<LearningReceipt, CouncilError> {
        self.learning.process_event(event_id).await
    }

    pub async fn approve_observation(
        &self,
        observation_id: &str,
    ) -> Result<Observation, CouncilError> {
        self.observations.approve(observation_id).await
    }

    pub async fn deprecate_observation(
        &self,
        observation_id: &str,
    ) -> Result<Observation, CouncilError> {
        self.observations.deprecate(observation_id).await
    }

    pub async fn list_observations(
        &self,
        persona_id: Option<&str>,
        status: Option<ObservationStatus>,
    ) -> Result<Vec<Observation>, CouncilError> {
        self.observations.list(persona_id, status).await
    }

    pub async fn list_learning_events(&self) -> Result<Vec<LearningEventView>, CouncilError> {
        let store = self.store.as_ref();
        let mut events: Vec<LearningEvent> = store::load_all(store, &RecordFilter::all()).await?;
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let mut views = Vec::with_capacity(events.len());
        for event in events {
            let receipt = store::load(store, &event.id).await?;
            views.push(LearningEventView { event, receipt });
        }
        Ok(views)
    }

    // ==================== Queries ====================

    pub async fn get_proposal(&self, proposal_id: &str) -> Result<ProposalView, CouncilError> {
        let store = self.store.as_ref();
        let proposal: Proposal = store::load(store, proposal_id)
            .await?
            .ok_or_else(|| CouncilError::not_found("proposal", proposal_id))?;
        Ok(ProposalView {
            proposal,
            evaluations: store::load(store, proposal_id).await?,
            deliberation: store::load(store, proposal_id).await?,
            decision: store::load(store, proposal_id).await?,
        })
    }

    /// Proposals, newest first, optionally filtered by status name
    pub async fn list_proposals(
        &self,
        status: Option<&str>,
    ) -> Result<Vec<Proposal>, CouncilError> {
        let mut filter = RecordFilter::all();
        if let Some(status) = status {
            filter = filter.eq("status", status);
        }
        let mut proposals: Vec<Proposal> = store::load_all(self.store.as_ref(), &filter).await?;
        proposals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(proposals)
    }

    pub async fn list_decisions(
        &self,
        status: Option<DecisionStatus>,
    ) -> Result<Vec<Decision>, CouncilError> {
        let mut filter = RecordFilter::all();
        if let Some(status) = status {
            filter = filter.eq("status", status.as_str());
        }
        let mut decisions: Vec<Decision> = store::load_all(self.store.as_ref(), &filter).await?;
        decisions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(decisions)
    }

    pub async fn list_teams(&self) -> Result<Vec<EntityProfile>, CouncilError> {
        let mut teams: Vec<EntityProfile> =
            store::load_all(self.store.as_ref(), &RecordFilter::all()).await?;
        teams.sort_by(|a, b| a.canonical_name.to_lowercase().cmp(&b.canonical_name.to_lowercase()));
        Ok(teams)
    }

    pub async fn get_team(&self, team_id: &str) -> Result<EntityProfile, CouncilError> {
        store::load(self.store.as_ref(), team_id)
            .await?
            .ok_or_else(|| CouncilError::not_found("team", team_id))
    }
}
