//! Stage 2: independent per-persona evaluation

use super::RunCouncilUseCase;
use super::types::{Contextualized, Evaluated, RunCouncilError};
use crate::ports::progress::ProgressNotifier;
use crate::ports::store::{self, RecordFilter, StoreError};
use crate::ports::text_generator::{GenerationError, TextGenerator};
use crate::ports::transcript_logger::TranscriptLogger;
use crate::use_cases::shared::{Purpose, generate_logged};
use council_domain::proposal::rank_similar;
use council_domain::{
    Decision, Evaluation, EvaluationContext, EvaluationSet, LearningEvent, LearningTrigger,
    Observation, PersonaConfig, PromptTemplate, Proposal, ProposalStatus, SimilarProposal, Stage,
    parse_evaluation_response, select_for_prompt,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

impl<G: TextGenerator + 'static> RunCouncilUseCase<G> {
    pub(super) async fn evaluate(
        &self,
        context: Contextualized,
        progress: &dyn ProgressNotifier,
    ) -> Result<Evaluated, RunCouncilError> {
        let stage = Stage::Evaluate;
        let personas = &self.config.personas;
        let mut proposal = context.proposal.clone();
        let Some(details) = proposal.details.clone() else {
            return Err(RunCouncilError::StageFailed {
                stage,
                reason: "proposal has no parsed details".to_string(),
            });
        };

        info!("Stage 2: evaluating with {} personas", personas.len());
        progress.on_stage_start(stage, personas.len());

        let observations: Vec<Observation> = store::load_all(
            self.store.as_ref(),
            &RecordFilter::all().eq("status", "active"),
        )
        .await
        .map_err(RunCouncilError::store(stage))?;
        let similar = self
            .similar_proposals(&proposal)
            .await
            .map_err(RunCouncilError::store(stage))?;

        let mut join_set = JoinSet::new();
        for persona in personas {
            let selected = select_for_prompt(
                &observations,
                &persona.id,
                &proposal.tags,
                self.config.learning.max_prompt_observations,
            );
            let prompt = PromptTemplate::evaluation(
                persona,
                &EvaluationContext {
                    details: &details,
                    team: context.team.as_ref(),
                    observations: &selected,
                    similar: &similar,
                },
            );
            let observation_ids: Vec<String> = selected.iter().map(|o| o.id.clone()).collect();

            let generator = Arc::clone(&self.generator);
            let transcript = Arc::clone(&self.transcript);
            let persona = persona.clone();
            let proposal_id = proposal.id.clone();
            let timeout = self.config.timeout_for(&persona);

            join_set.spawn(async move {
                let result = Self::evaluate_one(
                    generator.as_ref(),
                    transcript.as_ref(),
                    &persona,
                    &prompt,
                    timeout,
                    &proposal_id,
                )
                .await;
                (persona, observation_ids, result)
            });
        }

        let similar_ids: Vec<String> = similar.iter().map(|s| s.proposal_id.clone()).collect();
        let mut finished = Vec::new();
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok((persona, observation_ids, Ok(mut evaluation))) => {
                    info!(
                        "{} scored {} ({})",
                        persona.name, evaluation.score, evaluation.recommendation
                    );
                    progress.on_task_complete(stage, &persona.id, true);
                    evaluation.observation_ids = observation_ids;
                    evaluation.similar_proposal_ids = similar_ids.clone();
                    finished.push(evaluation);
                }
                Ok((persona, _, Err(e))) => {
                    warn!("{} failed to evaluate: {}", persona.name, e);
                    progress.on_task_complete(stage, &persona.id, false);
                    let reason = format!("{}: {}", e.kind(), e);
                    finished.push(Evaluation::fallback(&proposal.id, &persona, reason));
                }
                Err(e) => {
                    warn!("Evaluation task panicked: {}", e);
                }
            }
        }

        // One evaluation per persona, in panel order
        let evaluations: Vec<Evaluation> = personas
            .iter()
            .map(|persona| {
                finished
                    .iter()
                    .position(|e| e.persona_id == persona.id)
                    .map(|i| finished.swap_remove(i))
                    .unwrap_or_else(|| {
                        Evaluation::fallback(
                            &proposal.id,
                            persona,
                            "task_aborted: evaluation task did not complete",
                        )
                    })
            })
            .collect();

        let failed = evaluations.iter().filter(|e| e.is_fallback()).count();
        if failed == evaluations.len() {
            return Err(RunCouncilError::StageFailed {
                stage,
                reason: format!("all {} personas failed to evaluate", failed),
            });
        }
        if failed > 0 {
            warn!("{} of {} personas fell back", failed, evaluations.len());
        }

        store::save(
            self.store.as_ref(),
            &EvaluationSet::new(&proposal.id, evaluations.clone()),
        )
        .await
        .map_err(RunCouncilError::store(stage))?;
        proposal.set_status(ProposalStatus::Evaluated);
        store::save(self.store.as_ref(), &proposal)
            .await
            .map_err(RunCouncilError::store(stage))?;

        progress.on_stage_complete(stage);
        Ok(Evaluated {
            context: Contextualized {
                proposal,
                team: context.team,
            },
            evaluations,
        })
    }

    async fn evaluate_one(
        generator: &G,
        transcript: &dyn TranscriptLogger,
        persona: &PersonaConfig,
        prompt: &str,
        timeout: Duration,
        proposal_id: &str,
    ) -> Result<Evaluation, GenerationError> {
        let response = generate_logged(
            generator,
            transcript,
            persona,
            prompt,
            timeout,
            proposal_id,
            Purpose::new("evaluation"),
        )
        .await?;
        let parsed = parse_evaluation_response(&response)
            .map_err(|e| GenerationError::MalformedOutput(e.to_string()))?;
        let evaluation = parsed.into_evaluation(proposal_id, persona);
        if evaluation.degraded {
            warn!(
                "{} response missing fields: {}",
                persona.name,
                evaluation.missing_fields.join(", ")
            );
        }
        Ok(evaluation)
    }

    /// Decided proposals sharing tags with this one, with their final
    /// decision and latest recorded outcome
    async fn similar_proposals(
        &self,
        proposal: &Proposal,
    ) -> Result<Vec<SimilarProposal>, StoreError> {
        let limit = self.config.similar_proposal_limit;
        if limit == 0 || proposal.tags.is_empty() {
            return Ok(Vec::new());
        }

        let decided: Vec<Proposal> = store::load_all(
            self.store.as_ref(),
            &RecordFilter::all().eq("status", "decided"),
        )
        .await?;
        let candidates = decided
            .iter()
            .map(|p| SimilarProposal::from_proposal(p, String::new(), None))
            .collect();
        let mut ranked = rank_similar(candidates, &proposal.tags, &proposal.id, limit);

        for similar in &mut ranked {
            if let Some(decision) =
                store::load::<Decision>(self.store.as_ref(), &similar.proposal_id).await?
            {
                similar.decision = decision.status.to_string();
            }
            let events: Vec<LearningEvent> = store::load_all(
                self.store.as_ref(),
                &RecordFilter::all()
                    .eq("proposal_id", similar.proposal_id.as_str())
                    .eq("trigger.kind", "outcome"),
            )
            .await?;
            similar.outcome = events
                .iter()
                .max_by_key(|e| e.created_at)
                .and_then(|e| match &e.trigger {
                    LearningTrigger::Outcome { outcome } => Some(outcome.result.to_string()),
                    LearningTrigger::Override { .. } => None,
                });
        }
        Ok(ranked)
    }
}
