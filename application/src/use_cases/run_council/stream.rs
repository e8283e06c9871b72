//! Streaming form of the pipeline.
//!
//! The stream is a small state machine driven by `futures::stream::unfold`:
//! each poll either announces the next stage, runs it, or emits the single
//! terminal event. Nothing runs until the stream is polled.

use super::RunCouncilUseCase;
use super::types::{Contextualized, Deliberated, Evaluated, RunCouncilError, RunCouncilOutput};
use crate::ports::progress::NoProgress;
use crate::ports::text_generator::TextGenerator;
use council_domain::{EventKind, PipelineEvent, Proposal, Stage};
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use serde_json::{Value, json};

/// Pipeline output carried between stages
enum Carry {
    Raw(Proposal),
    Contextualized(Contextualized),
    Evaluated(Evaluated),
    Deliberated(Deliberated),
    Decided(Box<RunCouncilOutput>),
}

enum Step {
    Start(Stage, Carry),
    Run(Stage, Carry),
    Finish(Box<RunCouncilOutput>),
}

pub(super) fn pipeline_events<G: TextGenerator + 'static>(
    use_case: RunCouncilUseCase<G>,
    proposal: Proposal,
) -> BoxStream<'static, PipelineEvent> {
    let proposal_id = proposal.id.clone();
    let initial = Some((use_case, Step::Start(Stage::Contextualize, Carry::Raw(proposal))));

    stream::unfold(initial, move |state| {
        let proposal_id = proposal_id.clone();
        async move {
            let (use_case, step) = state?;
            let (event, next) = match step {
                Step::Start(stage, carry) => (
                    PipelineEvent::stage_start(stage, &proposal_id),
                    Some(Step::Run(stage, carry)),
                ),
                Step::Run(stage, carry) => match use_case.advance(carry).await {
                    Ok(Carry::Decided(output)) => (
                        stage_complete(stage, &proposal_id, decided_payload(&output)),
                        Some(Step::Finish(output)),
                    ),
                    Ok(carry) => {
                        let payload = stage_payload(&carry);
                        let next_stage = next_stage(stage);
                        (
                            stage_complete(stage, &proposal_id, payload),
                            next_stage.map(|s| Step::Start(s, carry)),
                        )
                    }
                    Err(e) => (
                        PipelineEvent::error(&proposal_id, Some(e.stage()), e.to_string()),
                        None,
                    ),
                },
                Step::Finish(output) => (
                    PipelineEvent::new(
                        EventKind::Complete,
                        &proposal_id,
                        json!({
                            "status": output.decision.status.as_str(),
                            "decision": output.decision,
                        }),
                    ),
                    None,
                ),
            };
            Some((event, next.map(|step| (use_case, step))))
        }
    })
    .boxed()
}

impl<G: TextGenerator + 'static> RunCouncilUseCase<G> {
    async fn advance(&self, carry: Carry) -> Result<Carry, RunCouncilError> {
        match carry {
            Carry::Raw(proposal) => self
                .guarded(&proposal, self.contextualize(proposal.clone(), &NoProgress))
                .await
                .map(Carry::Contextualized),
            Carry::Contextualized(context) => {
                let current = context.proposal.clone();
                self.guarded(&current, self.evaluate(context, &NoProgress))
                    .await
                    .map(Carry::Evaluated)
            }
            Carry::Evaluated(evaluated) => {
                let current = evaluated.context.proposal.clone();
                self.guarded(&current, self.deliberate(evaluated, &NoProgress))
                    .await
                    .map(Carry::Deliberated)
            }
            Carry::Deliberated(deliberated) => {
                let current = deliberated.evaluated.context.proposal.clone();
                self.guarded(&current, self.decide(deliberated, &NoProgress))
                    .await
                    .map(|output| Carry::Decided(Box::new(output)))
            }
            Carry::Decided(output) => Ok(Carry::Decided(output)),
        }
    }
}

fn next_stage(stage: Stage) -> Option<Stage> {
    match stage {
        Stage::Contextualize => Some(Stage::Evaluate),
        Stage::Evaluate => Some(Stage::Deliberate),
        Stage::Deliberate => Some(Stage::Decide),
        Stage::Decide => None,
    }
}

fn stage_complete(stage: Stage, proposal_id: &str, payload: Value) -> PipelineEvent {
    PipelineEvent::new(EventKind::StageComplete(stage), proposal_id, payload)
}

fn stage_payload(carry: &Carry) -> Value {
    match carry {
        Carry::Raw(_) => Value::Null,
        Carry::Contextualized(context) => json!({
            "title": context.proposal.title(),
            "requested_amount": context.proposal.requested_amount(),
            "tags": context.proposal.tags,
            "warnings": context.proposal.warnings,
            "team_match": context.proposal.team_match,
        }),
        Carry::Evaluated(evaluated) => json!({
            "evaluations": evaluated
                .evaluations
                .iter()
                .map(|e| json!({
                    "persona_id": e.persona_id,
                    "score": e.score,
                    "recommendation": e.recommendation.as_str(),
                    "confidence": e.confidence.as_str(),
                    "fallback": e.is_fallback(),
                }))
                .collect::<Vec<_>>(),
        }),
        Carry::Deliberated(deliberated) => json!({
            "skipped": deliberated.deliberation.skipped,
            "rounds": deliberated.deliberation.rounds.len(),
            "position_changes": deliberated.deliberation.position_changes,
            "changed_personas": deliberated.deliberation.changed_personas,
        }),
        Carry::Decided(output) => decided_payload(output),
    }
}

fn decided_payload(output: &RunCouncilOutput) -> Value {
    json!({
        "status": output.decision.status.as_str(),
        "primary_recommendation": output.decision.primary_recommendation.as_str(),
        "consensus_strength": output.decision.consensus_strength,
        "routing_reason": output.decision.routing_reason,
    })
}
