//! Stage 3: anonymized peer review and position revision

use super::RunCouncilUseCase;
use super::types::{Contextualized, Deliberated, Evaluated, RunCouncilError};
use crate::ports::progress::ProgressNotifier;
use crate::ports::store;
use crate::ports::text_generator::TextGenerator;
use crate::use_cases::shared::{Purpose, generate_logged};
use council_domain::{
    DeliberationRecord, DeliberationRound, Evaluation, EvaluationSet, PersonaTurn, PromptTemplate,
    ProposalStatus, Stage, parse_deliberation_response, peer_bundle,
};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

impl<G: TextGenerator + 'static> RunCouncilUseCase<G> {
    pub(super) async fn deliberate(
        &self,
        evaluated: Evaluated,
        progress: &dyn ProgressNotifier,
    ) -> Result<Deliberated, RunCouncilError> {
        let stage = Stage::Deliberate;
        let Evaluated {
            context,
            mut evaluations,
        } = evaluated;
        let mut proposal = context.proposal.clone();
        let policy = self.config.deliberation;

        let skip = if policy.rounds == 0 {
            Some("no deliberation rounds configured".to_string())
        } else {
            policy
                .trigger
                .skip_reason(proposal.requested_amount(), &evaluations)
        };

        let record = match skip {
            Some(reason) => {
                info!("Stage 3: skipped ({})", reason);
                progress.on_stage_skipped(stage, &reason);
                DeliberationRecord::skipped(&proposal.id, reason)
            }
            None => {
                let summary = proposal
                    .details
                    .as_ref()
                    .map(|d| {
                        if d.summary.is_empty() {
                            d.title.clone()
                        } else {
                            d.summary.clone()
                        }
                    })
                    .unwrap_or_default();
                let mut record = DeliberationRecord::new(&proposal.id);
                for round in 1..=policy.rounds {
                    let outcome = self
                        .deliberation_round(&proposal.id, &summary, round, &mut evaluations, progress)
                        .await?;
                    record.rounds.push(outcome);
                }
                record.tally(&evaluations);
                info!(
                    "Stage 3: {} of {} personas changed position",
                    record.position_changes,
                    evaluations.len()
                );
                record
            }
        };

        if record.skipped.is_none() {
            store::save(
                self.store.as_ref(),
                &EvaluationSet::new(&proposal.id, evaluations.clone()),
            )
            .await
            .map_err(RunCouncilError::store(stage))?;
        }
        store::save(self.store.as_ref(), &record)
            .await
            .map_err(RunCouncilError::store(stage))?;
        proposal.set_status(ProposalStatus::Deliberated);
        store::save(self.store.as_ref(), &proposal)
            .await
            .map_err(RunCouncilError::store(stage))?;

        progress.on_stage_complete(stage);
        Ok(Deliberated {
            evaluated: Evaluated {
                context: Contextualized {
                    proposal,
                    team: context.team,
                },
                evaluations,
            },
            deliberation: record,
        })
    }

    /// One pass over the panel. Every persona sees the same pre-round
    /// state; revisions are applied once all responses are in.
    async fn deliberation_round(
        &self,
        proposal_id: &str,
        summary: &str,
        round: u32,
        evaluations: &mut [Evaluation],
        progress: &dyn ProgressNotifier,
    ) -> Result<DeliberationRound, RunCouncilError> {
        let stage = Stage::Deliberate;
        let mut bundles = Vec::new();
        let mut join_set = JoinSet::new();

        for evaluation in evaluations.iter().filter(|e| !e.is_fallback()) {
            let Some(persona) = self.config.persona(&evaluation.persona_id).cloned() else {
                continue;
            };
            let bundle = peer_bundle(evaluations, proposal_id, &persona.id, round);
            if bundle.peers.is_empty() {
                continue;
            }
            let prompt = PromptTemplate::deliberation(evaluation, &bundle, summary, round);
            bundles.push(bundle);

            let generator = Arc::clone(&self.generator);
            let transcript = Arc::clone(&self.transcript);
            let timeout = self.config.timeout_for(&persona);
            let proposal_id = proposal_id.to_string();
            join_set.spawn(async move {
                let result = generate_logged(
                    generator.as_ref(),
                    transcript.as_ref(),
                    &persona,
                    &prompt,
                    timeout,
                    &proposal_id,
                    Purpose::round("deliberation", round),
                )
                .await;
                (persona, result)
            });
        }

        info!("Stage 3: round {} with {} personas", round, bundles.len());
        progress.on_stage_start(stage, bundles.len());

        let mut responses = Vec::new();
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(pair) => responses.push(pair),
                Err(e) => warn!("Deliberation task panicked: {}", e),
            }
        }

        let mut turns = Vec::new();
        for (persona, result) in responses {
            let Some(evaluation) = evaluations.iter_mut().find(|e| e.persona_id == persona.id) else {
                continue;
            };
            match result {
                Ok(text) => {
                    progress.on_task_complete(stage, &persona.id, true);
                    let parsed = parse_deliberation_response(&text);
                    let (score, recommendation) = parsed.revision();
                    if score.is_some() || recommendation.is_some() {
                        evaluation.revise(round, score, recommendation, parsed.response.clone());
                    }
                    turns.push(PersonaTurn {
                        persona_id: persona.id.clone(),
                        change: evaluation.position_changed,
                        response: parsed.response,
                        failure_reason: None,
                    });
                }
                Err(e) => {
                    warn!("{} failed to deliberate: {}", persona.name, e);
                    progress.on_task_complete(stage, &persona.id, false);
                    turns.push(PersonaTurn {
                        persona_id: persona.id.clone(),
                        change: evaluation.position_changed,
                        response: String::new(),
                        failure_reason: Some(format!("{}: {}", e.kind(), e)),
                    });
                }
            }
        }

        if !bundles.is_empty() && turns.iter().all(|t| t.failure_reason.is_some()) {
            return Err(RunCouncilError::StageFailed {
                stage,
                reason: format!("every persona failed in deliberation round {}", round),
            });
        }

        turns.sort_by_key(|t| {
            self.config
                .personas
                .iter()
                .position(|p| p.id == t.persona_id)
                .unwrap_or(usize::MAX)
        });
        bundles.sort_by_key(|b| {
            self.config
                .personas
                .iter()
                .position(|p| p.id == b.persona_id)
                .unwrap_or(usize::MAX)
        });

        Ok(DeliberationRound {
            round,
            bundles,
            turns,
        })
    }
}
