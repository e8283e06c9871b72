//! Run Council use case
//!
//! Drives one proposal through the four-stage review pipeline:
//!
//! | Stage               | Generator calls          | Persists                      |
//! |---------------------|--------------------------|-------------------------------|
//! | 1. Contextualize    | parser (unless JSON)     | team profile, proposal        |
//! | 2. Evaluate         | one per persona          | evaluation set, proposal      |
//! | 3. Deliberate       | one per persona per round| evaluation set, deliberation  |
//! | 4. Decide           | none                     | decision, team funding        |
//!
//! Stages run strictly in order and each one persists its output only once
//! it has fully resolved. A failed run leaves the proposal in the `failed`
//! status with the stage that stopped it.

mod contextualize;
mod decide;
mod deliberate;
mod evaluate;
mod stream;
mod types;

pub use types::{RunCouncilError, RunCouncilInput, RunCouncilOutput};

use crate::config::CouncilConfig;
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::ports::store::{self, CouncilStore};
use crate::ports::text_generator::TextGenerator;
use crate::ports::transcript_logger::{NoTranscriptLogger, TranscriptEvent, TranscriptLogger};
use crate::use_cases::locks::CouncilLocks;
use council_domain::{PipelineEvent, Proposal};
use futures::stream::BoxStream;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Use case for running a proposal through the council
pub struct RunCouncilUseCase<G: TextGenerator + 'static> {
    pub(super) generator: Arc<G>,
    pub(super) store: Arc<dyn CouncilStore>,
    pub(super) config: Arc<CouncilConfig>,
    pub(super) transcript: Arc<dyn TranscriptLogger>,
    pub(super) locks: Arc<CouncilLocks>,
}

impl<G: TextGenerator + 'static> Clone for RunCouncilUseCase<G> {
    fn clone(&self) -> Self {
        Self {
            generator: self.generator.clone(),
            store: self.store.clone(),
            config: self.config.clone(),
            transcript: self.transcript.clone(),
            locks: self.locks.clone(),
        }
    }
}

impl<G: TextGenerator + 'static> RunCouncilUseCase<G> {
    pub fn new(
        generator: Arc<G>,
        store: Arc<dyn CouncilStore>,
        config: Arc<CouncilConfig>,
    ) -> Self {
        Self {
            generator,
            store,
            config,
            transcript: Arc::new(NoTranscriptLogger),
            locks: Arc::new(CouncilLocks::new()),
        }
    }

    /// Set a transcript logger for prompts, responses and milestones
    pub fn with_transcript_logger(mut self, transcript: Arc<dyn TranscriptLogger>) -> Self {
        self.transcript = transcript;
        self
    }

    /// Share locks with the other use cases of the same council
    pub fn with_locks(mut self, locks: Arc<CouncilLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Execute the pipeline without progress reporting
    pub async fn execute(
        &self,
        input: RunCouncilInput,
    ) -> Result<RunCouncilOutput, RunCouncilError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the pipeline with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: RunCouncilInput,
        progress: &dyn ProgressNotifier,
    ) -> Result<RunCouncilOutput, RunCouncilError> {
        let proposal = Proposal::new(input.content);
        info!("Starting council run for proposal {}", proposal.id);

        let context = self
            .guarded(&proposal, self.contextualize(proposal.clone(), progress))
            .await?;

        let current = context.proposal.clone();
        let evaluated = self.guarded(&current, self.evaluate(context, progress)).await?;

        let current = evaluated.context.proposal.clone();
        let deliberated = self
            .guarded(&current, self.deliberate(evaluated, progress))
            .await?;

        let current = deliberated.evaluated.context.proposal.clone();
        let output = self.guarded(&current, self.decide(deliberated, progress)).await?;

        info!(
            "Council run finished for proposal {}: {}",
            output.proposal.id, output.decision.status
        );
        Ok(output)
    }

    /// Execute the pipeline as a lazy stream of [`PipelineEvent`]s.
    ///
    /// Every stage yields a start event followed by a completion or error
    /// event, and the stream ends with exactly one terminal event. Dropping
    /// the stream abandons the run at the next stage boundary.
    pub fn stream(&self, input: RunCouncilInput) -> BoxStream<'static, PipelineEvent> {
        stream::pipeline_events(self.clone(), Proposal::new(input.content))
    }

    /// Await one stage, recording a failed status on the proposal if it errors
    pub(super) async fn guarded<T, F>(
        &self,
        proposal: &Proposal,
        stage: F,
    ) -> Result<T, RunCouncilError>
    where
        F: Future<Output = Result<T, RunCouncilError>>,
    {
        match stage.await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.record_failure(proposal.clone(), &e).await;
                Err(e)
            }
        }
    }

    async fn record_failure(&self, mut proposal: Proposal, error: &RunCouncilError) {
        warn!(
            "Council run for proposal {} failed at {}: {}",
            proposal.id,
            error.stage().as_str(),
            error
        );
        proposal.fail(error.stage(), error.to_string());
        self.transcript.log(TranscriptEvent::new(
            "pipeline_failed",
            json!({
                "proposal_id": proposal.id,
                "stage": error.stage().as_str(),
                "error": error.to_string(),
            }),
        ));
        if let Err(e) = store::save(self.store.as_ref(), &proposal).await {
            warn!("Could not record failure of proposal {}: {}", proposal.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::store::{Collection, RecordFilter};
    use crate::ports::text_generator::GenerationError;
    use crate::use_cases::testing::{
        MemoryStore, MockGenerator, evaluation_response, proposal_json, test_config, unanimous,
    };
    use council_domain::{
        DecisionStatus, DeliberationPolicy, DeliberationTrigger, EntityProfile, EvaluationSet,
        PositionChange, ProposalStatus, RoutingRule, Stage,
    };
    use futures::StreamExt;
    use std::time::Duration;

    fn use_case(
        generator: MockGenerator,
        config: CouncilConfig,
    ) -> (RunCouncilUseCase<MockGenerator>, Arc<MockGenerator>, Arc<MemoryStore>) {
        let generator = Arc::new(generator);
        let store = Arc::new(MemoryStore::new());
        let use_case = RunCouncilUseCase::new(generator.clone(), store.clone(), Arc::new(config));
        (use_case, generator, store)
    }

    fn deliberating(config: CouncilConfig) -> CouncilConfig {
        config.with_deliberation(DeliberationPolicy {
            trigger: DeliberationTrigger::Always,
            rounds: 1,
        })
    }

    #[tokio::test]
    async fn test_unanimous_small_request_auto_approves() {
        let (use_case, _, store) = use_case(unanimous(8, "APPROVE"), test_config());
        let content = proposal_json("Indexer", "Acme Labs", 10_000.0, "0xABC");

        let output = use_case.execute(RunCouncilInput::new(content)).await.unwrap();

        assert_eq!(output.decision.status, DecisionStatus::AutoApproved);
        assert!(output.decision.auto_executed);
        assert_eq!(output.decision.consensus_strength, 1.0);
        assert_eq!(output.evaluations.len(), 4);
        assert_eq!(output.proposal.status, ProposalStatus::Decided);
        assert!(output.deliberation.skipped.is_some());

        let stored: EvaluationSet = store::require(store.as_ref(), &output.proposal.id)
            .await
            .unwrap();
        assert_eq!(stored.evaluations.len(), 4);

        let team_id = output.proposal.team_id().unwrap();
        let team: EntityProfile = store::require(store.as_ref(), team_id).await.unwrap();
        assert_eq!(team.total_funding(), 10_000.0);
        assert_eq!(team.grants_received(), 1);
    }

    #[tokio::test]
    async fn test_amount_threshold_applies_at_full_consensus() {
        let (use_case, _, store) = use_case(unanimous(9, "STRONG_APPROVE"), test_config());
        let content = proposal_json("Bridge", "Acme Labs", 75_000.0, "0xABC");

        let output = use_case.execute(RunCouncilInput::new(content)).await.unwrap();

        assert_eq!(output.decision.status, DecisionStatus::NeedsReview);
        assert_eq!(output.decision.routing_rule, RoutingRule::AmountThreshold);
        assert_eq!(output.decision.consensus_strength, 1.0);

        let team_id = output.proposal.team_id().unwrap();
        let team: EntityProfile = store::require(store.as_ref(), team_id).await.unwrap();
        assert_eq!(team.total_funding(), 0.0);
    }

    #[tokio::test]
    async fn test_failed_persona_falls_back_to_lean_reject() {
        let generator = unanimous(8, "APPROVE")
            .fail("budget", GenerationError::Transport("connection reset".to_string()));
        let (use_case, _, _) = use_case(generator, test_config());
        let content = proposal_json("Indexer", "Acme Labs", 5_000.0, "0xABC");

        let output = use_case.execute(RunCouncilInput::new(content)).await.unwrap();

        assert_eq!(output.evaluations.len(), 4);
        let budget = output
            .evaluations
            .iter()
            .find(|e| e.persona_id == "budget")
            .unwrap();
        assert!(budget.is_fallback());
        assert!(budget.failure_reason.as_deref().unwrap().starts_with("transport"));
        assert_eq!(output.decision.status, DecisionStatus::NeedsReview);
        assert_eq!(output.decision.routing_rule, RoutingRule::SplitDecision);
    }

    #[tokio::test]
    async fn test_fallback_vote_joins_unanimous_rejection() {
        let generator = unanimous(3, "REJECT")
            .fail("budget", GenerationError::Transport("connection reset".to_string()));
        let (use_case, _, _) = use_case(generator, test_config());
        let content = proposal_json("Indexer", "Acme Labs", 10_000.0, "0xABC");

        let output = use_case.execute(RunCouncilInput::new(content)).await.unwrap();

        assert_eq!(output.evaluations.iter().filter(|e| e.is_fallback()).count(), 1);
        assert_eq!(output.decision.consensus_strength, 1.0);
        assert_eq!(output.decision.status, DecisionStatus::AutoRejected);
        assert!(output.decision.auto_executed);
    }

    #[tokio::test]
    async fn test_slow_persona_times_out_into_fallback() {
        let generator = unanimous(8, "APPROVE").delay("impact", Duration::from_millis(500));
        let config = test_config().with_request_timeout(Duration::from_millis(50));
        let (use_case, _, _) = use_case(generator, config);
        let content = proposal_json("Indexer", "Acme Labs", 5_000.0, "0xABC");

        let output = use_case.execute(RunCouncilInput::new(content)).await.unwrap();

        let impact = output
            .evaluations
            .iter()
            .find(|e| e.persona_id == "impact")
            .unwrap();
        assert!(impact.failure_reason.as_deref().unwrap().starts_with("timeout"));
        assert_eq!(output.evaluations.iter().filter(|e| e.is_fallback()).count(), 1);
    }

    #[tokio::test]
    async fn test_all_personas_failing_aborts_and_records_failure() {
        let (use_case, _, store) = use_case(MockGenerator::new(), test_config());
        let content = proposal_json("Indexer", "Acme Labs", 5_000.0, "0xABC");

        let err = use_case.execute(RunCouncilInput::new(content)).await.unwrap_err();

        assert_eq!(err.stage(), Stage::Evaluate);
        assert!(matches!(err, RunCouncilError::StageFailed { .. }));
        let proposals: Vec<Proposal> = store::load_all(store.as_ref(), &RecordFilter::all())
            .await
            .unwrap();
        assert_eq!(proposals.len(), 1);
        assert!(matches!(
            proposals[0].status,
            ProposalStatus::Failed { stage: Stage::Evaluate, .. }
        ));
        assert_eq!(store.count(Collection::Decisions), 0);
    }

    #[tokio::test]
    async fn test_invalid_submission_fails_at_contextualize() {
        let (use_case, generator, store) = use_case(unanimous(8, "APPROVE"), test_config());
        let content = r#"{"title": "", "requesting_entity": "Acme", "requested_amount": 0}"#;

        let err = use_case.execute(RunCouncilInput::new(content)).await.unwrap_err();

        assert!(matches!(err, RunCouncilError::InvalidProposal(_)));
        assert_eq!(err.stage(), Stage::Contextualize);
        assert_eq!(generator.call_count(), 0);
        let proposals: Vec<Proposal> = store::load_all(store.as_ref(), &RecordFilter::all())
            .await
            .unwrap();
        assert!(matches!(
            proposals[0].status,
            ProposalStatus::Failed { stage: Stage::Contextualize, .. }
        ));
    }

    #[tokio::test]
    async fn test_string_amount_with_suffix_goes_to_human_review() {
        let (use_case, _, _) = use_case(unanimous(9, "STRONG_APPROVE"), test_config());
        let mut application: serde_json::Value =
            serde_json::from_str(&proposal_json("Bridge", "Acme Labs", 120_000.0, "0xABC")).unwrap();
        application["requested_amount"] = serde_json::json!("120k");

        let output = use_case
            .execute(RunCouncilInput::new(application.to_string()))
            .await
            .unwrap();

        assert_eq!(output.proposal.requested_amount(), 120_000.0);
        assert_eq!(output.decision.status, DecisionStatus::NeedsReview);
        assert_eq!(output.decision.routing_rule, RoutingRule::AmountThreshold);
    }

    #[tokio::test]
    async fn test_unreadable_amount_fails_at_contextualize() {
        let (use_case, generator, _) = use_case(unanimous(8, "APPROVE"), test_config());
        let mut application: serde_json::Value =
            serde_json::from_str(&proposal_json("Bridge", "Acme Labs", 1.0, "0xABC")).unwrap();
        application["requested_amount"] = serde_json::json!("a lot");

        let err = use_case
            .execute(RunCouncilInput::new(application.to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, RunCouncilError::InvalidProposal(_)));
        assert_eq!(err.stage(), Stage::Contextualize);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_free_text_is_extracted_by_parser() {
        let extraction = format!(
            "Here is the extraction:\n```json\n{}\n```",
            proposal_json("Wallet SDK", "Acme Labs", 8_000.0, "0xABC")
        );
        let generator = unanimous(8, "APPROVE").respond("parser", extraction);
        let (use_case, generator, _) = use_case(generator, test_config());

        let output = use_case
            .execute(RunCouncilInput::new("We are Acme Labs and we want to build a wallet SDK."))
            .await
            .unwrap();

        assert_eq!(output.proposal.title(), "Wallet SDK");
        let parser_prompts = generator.prompts_for("parser");
        assert_eq!(parser_prompts.len(), 1);
        assert!(parser_prompts[0].contains("wallet SDK"));
    }

    #[tokio::test]
    async fn test_deliberation_revises_and_splits_panel() {
        let mut generator = MockGenerator::new()
            .then("technical", Ok(evaluation_response(8, "APPROVE")))
            .then(
                "technical",
                Ok("POSITION_CHANGE: reversed\nUPDATED_RECOMMENDATION: reject\n\
                    UPDATED_SCORE: 3\nDELIBERATION_RESPONSE: The budget concerns are convincing."
                    .to_string()),
            );
        for id in ["ecosystem", "budget", "impact"] {
            generator = generator
                .then(id, Ok(evaluation_response(8, "APPROVE")))
                .then(
                    id,
                    Ok("POSITION_CHANGE: maintained\nDELIBERATION_RESPONSE: My view holds.".to_string()),
                );
        }
        let (use_case, generator, store) = use_case(generator, deliberating(test_config()));
        let content = proposal_json("Indexer", "Acme Labs", 5_000.0, "0xABC");

        let output = use_case.execute(RunCouncilInput::new(content)).await.unwrap();

        assert_eq!(output.deliberation.rounds.len(), 1);
        assert_eq!(output.deliberation.position_changes, 1);
        assert_eq!(output.deliberation.changed_personas, vec!["technical"]);
        let technical = &output.evaluations[0];
        assert_eq!(technical.persona_id, "technical");
        assert_eq!(technical.position_changed, PositionChange::MoreCritical);
        assert_eq!(technical.original.score, 8.0);
        assert_eq!(technical.score, 3.0);
        assert_eq!(output.decision.status, DecisionStatus::NeedsReview);
        assert_eq!(output.decision.routing_rule, RoutingRule::SplitDecision);

        // Peers are anonymized in the deliberation prompt
        let prompts = generator.prompts_for("technical");
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("Reviewer A"));
        assert!(!prompts[1].contains("Budget Analyst"));

        let stored: EvaluationSet = store::require(store.as_ref(), &output.proposal.id)
            .await
            .unwrap();
        assert_eq!(stored.evaluations[0].revisions.len(), 1);
    }

    #[tokio::test]
    async fn test_returning_team_is_linked_by_payment_address() {
        let (use_case, _, store) = use_case(unanimous(8, "APPROVE"), test_config());

        let first = use_case
            .execute(RunCouncilInput::new(proposal_json("Indexer", "Acme Labs", 5_000.0, "0xABC")))
            .await
            .unwrap();
        let second = use_case
            .execute(RunCouncilInput::new(proposal_json("Explorer", "Acme Collective", 6_000.0, "0xabc")))
            .await
            .unwrap();

        assert_eq!(first.proposal.team_id(), second.proposal.team_id());
        assert_eq!(store.count(Collection::Teams), 1);
        let team: EntityProfile = store::require(store.as_ref(), first.proposal.team_id().unwrap())
            .await
            .unwrap();
        assert!(team.aliases.contains(&"Acme Collective".to_string()));
        assert_eq!(team.proposal_ids.len(), 2);
        assert_eq!(team.total_funding(), 11_000.0);
    }

    #[tokio::test]
    async fn test_concurrent_first_submissions_create_one_profile() {
        let (use_case, _, store) = use_case(unanimous(8, "APPROVE"), test_config());
        let a = use_case.clone();
        let b = use_case.clone();

        let (first, second) = tokio::join!(
            a.execute(RunCouncilInput::new(proposal_json("One", "Acme Labs", 5_000.0, "0xABC"))),
            b.execute(RunCouncilInput::new(proposal_json("Two", "Acme Labs", 5_000.0, "0xABC"))),
        );

        assert!(first.is_ok() && second.is_ok());
        assert_eq!(store.count(Collection::Teams), 1);
        let teams: Vec<EntityProfile> = store::load_all(store.as_ref(), &RecordFilter::all())
            .await
            .unwrap();
        assert_eq!(teams[0].total_funding(), 10_000.0);
    }

    #[tokio::test]
    async fn test_stream_emits_every_stage_in_order() {
        let (use_case, _, _) = use_case(unanimous(8, "APPROVE"), test_config());
        let content = proposal_json("Indexer", "Acme Labs", 5_000.0, "0xABC");

        let events: Vec<PipelineEvent> = use_case.stream(RunCouncilInput::new(content)).collect().await;

        let tags: Vec<String> = events.iter().map(|e| e.kind.tag()).collect();
        assert_eq!(
            tags,
            vec![
                "stage1_start",
                "stage1_complete",
                "stage2_start",
                "stage2_complete",
                "stage3_start",
                "stage3_complete",
                "stage4_start",
                "stage4_complete",
                "complete",
            ]
        );
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        let proposal_id = &events[0].proposal_id;
        assert!(events.iter().all(|e| &e.proposal_id == proposal_id));
        assert_eq!(events[8].payload["status"], "auto_approved");
    }

    #[tokio::test]
    async fn test_stream_ends_with_error_event() {
        let (use_case, _, _) = use_case(MockGenerator::new(), test_config());
        let content = proposal_json("Indexer", "Acme Labs", 5_000.0, "0xABC");

        let events: Vec<PipelineEvent> = use_case.stream(RunCouncilInput::new(content)).collect().await;

        let tags: Vec<String> = events.iter().map(|e| e.kind.tag()).collect();
        assert_eq!(tags, vec!["stage1_start", "stage1_complete", "stage2_start", "error"]);
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let (use_case, generator, store) = use_case(unanimous(8, "APPROVE"), test_config());
        let content = proposal_json("Indexer", "Acme Labs", 5_000.0, "0xABC");

        let stream = use_case.stream(RunCouncilInput::new(content));
        drop(stream);

        assert_eq!(generator.call_count(), 0);
        assert_eq!(store.count(Collection::Proposals), 0);
    }

    #[tokio::test]
    async fn test_decision_write_failure_is_reported_with_stage() {
        let (use_case, _, store) = use_case(unanimous(8, "APPROVE"), test_config());
        store.fail_writes_to(Collection::Decisions);
        let content = proposal_json("Indexer", "Acme Labs", 5_000.0, "0xABC");

        let err = use_case.execute(RunCouncilInput::new(content)).await.unwrap_err();

        assert!(matches!(err, RunCouncilError::Store { stage: Stage::Decide, .. }));
        let proposals: Vec<Proposal> = store::load_all(store.as_ref(), &RecordFilter::all())
            .await
            .unwrap();
        assert!(matches!(
            proposals[0].status,
            ProposalStatus::Failed { stage: Stage::Decide, .. }
        ));
    }
}
