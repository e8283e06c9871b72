//! Process Learning use case
//!
//! Turns learning events into persona reflections and folds the
//! reflections into observations:
//!
//! 1. Every persona that produced a real evaluation reflects on the event
//! 2. `CONTRADICTS` ids gain invalidating evidence
//! 3. A proposed pattern reinforces the most similar draft/reviewed
//!    observation, or becomes a new draft
//!
//! Evidence is counted at most once per event, and a stored receipt makes
//! re-processing an event a no-op.

use crate::config::CouncilConfig;
use crate::ports::store::{self, CouncilStore, RecordFilter};
use crate::ports::text_generator::{GenerationError, TextGenerator};
use crate::ports::transcript_logger::{NoTranscriptLogger, TranscriptEvent, TranscriptLogger};
use crate::use_cases::error::CouncilError;
use crate::use_cases::locks::CouncilLocks;
use crate::use_cases::shared::{Purpose, generate_logged};
use council_domain::{
    EvaluationSet, LearningEvent, LearningReceipt, LearningTrigger, Observation, ObservationStatus,
    PromptTemplate, Proposal, Reflection, best_match, parse_reflection,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Result of processing every pending event
#[derive(Debug, Clone, Default)]
pub struct LearningBatch {
    pub receipts: Vec<LearningReceipt>,
    /// Events that could not be processed, with the reason
    pub failures: Vec<(String, String)>,
}

impl LearningBatch {
    pub fn observations_touched(&self) -> usize {
        self.receipts.iter().map(LearningReceipt::touched).sum()
    }
}

/// Use case for processing learning events
pub struct ProcessLearningUseCase<G: TextGenerator + 'static> {
    generator: Arc<G>,
    store: Arc<dyn CouncilStore>,
    config: Arc<CouncilConfig>,
    transcript: Arc<dyn TranscriptLogger>,
    locks: Arc<CouncilLocks>,
}

impl<G: TextGenerator + 'static> Clone for ProcessLearningUseCase<G> {
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

impl<G: TextGenerator + 'static> ProcessLearningUseCase<G> {
    pub fn new(
        generator: Arc<G>,
        store: Arc<dyn CouncilStore>,
        config: Arc<CouncilConfig>,
        locks: Arc<CouncilLocks>,
    ) -> Self {
        Self {
            generator,
            store,
            config,
            transcript: Arc::new(NoTranscriptLogger),
            locks,
        }
    }

    pub fn with_transcript_logger(mut self, transcript: Arc<dyn TranscriptLogger>) -> Self {
        self.transcript = transcript;
        self
    }

    /// Process every event without a receipt, oldest first.
    ///
    /// A failing event is reported in the batch and does not stop the rest.
    pub async fn process_pending(&self) -> Result<LearningBatch, CouncilError> {
        let store = self.store.as_ref();
        let processed: HashSet<String> =
            store::load_all::<LearningReceipt>(store, &RecordFilter::all())
                .await?
                .into_iter()
                .map(|r| r.event_id)
                .collect();
        let mut pending: Vec<LearningEvent> = store::load_all::<LearningEvent>(store, &RecordFilter::all())
            .await?
            .into_iter()
            .filter(|e: &LearningEvent| !processed.contains(&e.id))
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        info!("Processing {} pending learning event(s)", pending.len());
        let mut batch = LearningBatch::default();
        for event in pending {
            match self.process_event(&event.id).await {
                Ok(receipt) => batch.receipts.push(receipt),
                Err(e) => {
                    warn!("Learning event {} failed: {}", event.id, e);
                    batch.failures.push((event.id, e.to_string()));
                }
            }
        }
        Ok(batch)
    }

    /// Process one event. Returns the stored receipt if it was already
    /// processed.
    pub async fn process_event(&self, event_id: &str) -> Result<LearningReceipt, CouncilError> {
        let store = self.store.as_ref();
        let _guard = self.locks.learning_events.lock(event_id).await;

        if let Some(receipt) = store::load::<LearningReceipt>(store, event_id).await? {
            debug!("Learning event {} already processed", event_id);
            return Ok(receipt);
        }

        let event: LearningEvent = store::load(store, event_id)
            .await?
            .ok_or_else(|| CouncilError::not_found("learning event", event_id))?;
        let proposal: Proposal = store::require(store, &event.proposal_id).await?;
        let Some(details) = proposal.details.clone() else {
            return Err(CouncilError::not_found("proposal details", &proposal.id));
        };
        let evaluations: EvaluationSet = store::require(store, &event.proposal_id).await?;
        let known: Vec<Observation> = store::load_all::<Observation>(store, &RecordFilter::all())
            .await?
            .into_iter()
            .filter(|o: &Observation| o.status != ObservationStatus::Deprecated)
            .collect();

        let mut join_set = JoinSet::new();
        for evaluation in evaluations.real() {
            let Some(persona) = self.config.persona(&evaluation.persona_id).cloned() else {
                debug!("Persona {} is no longer configured; skipping", evaluation.persona_id);
                continue;
            };
            let persona_known: Vec<&Observation> =
                known.iter().filter(|o| o.persona_id == persona.id).collect();
            let prompt = match &event.trigger {
                LearningTrigger::Override {
                    human_verdict,
                    rationale,
                    ..
                } => PromptTemplate::override_reflection(
                    evaluation,
                    &details,
                    human_verdict.as_str(),
                    rationale,
                    &persona_known,
                ),
                LearningTrigger::Outcome { outcome } => {
                    PromptTemplate::outcome_reflection(evaluation, &details, outcome, &persona_known)
                }
            };

            let generator = Arc::clone(&self.generator);
            let transcript = Arc::clone(&self.transcript);
            let timeout = self.config.timeout_for(&persona);
            let proposal_id = proposal.id.clone();
            join_set.spawn(async move {
                let result: Result<String, GenerationError> = generate_logged(
                    generator.as_ref(),
                    transcript.as_ref(),
                    &persona,
                    &prompt,
                    timeout,
                    &proposal_id,
                    Purpose::new("reflection"),
                )
                .await;
                (persona.id, result)
            });
        }

        let mut responses = Vec::new();
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(pair) => responses.push(pair),
                Err(e) => warn!("Reflection task panicked: {}", e),
            }
        }
        responses.sort_by_key(|(persona_id, _)| {
            self.config
                .personas
                .iter()
                .position(|p| &p.id == persona_id)
                .unwrap_or(usize::MAX)
        });

        let mut receipt = LearningReceipt::new(&event);
        for (persona_id, result) in responses {
            match result {
                Ok(text) => {
                    receipt.reflections += 1;
                    let reflection = parse_reflection(&text);
                    if reflection.is_empty() {
                        debug!("{} proposed no pattern for event {}", persona_id, event.id);
                        continue;
                    }
                    self.apply_reflection(&event, &persona_id, reflection, &mut receipt)
                        .await?;
                }
                Err(e) => {
                    warn!("{} failed to reflect: {}", persona_id, e);
                    receipt.failures.push(format!("{}: {}: {}", persona_id, e.kind(), e));
                }
            }
        }

        let receipt = receipt.finish();
        store::save(store, &receipt).await?;
        info!(
            "Learning event {} ({}): {} created, {} reinforced, {} contradicted",
            event.id,
            event.kind(),
            receipt.created.len(),
            receipt.reinforced.len(),
            receipt.contradicted.len()
        );
        self.transcript.log(TranscriptEvent::new(
            "learning_processed",
            json!({
                "event_id": event.id,
                "proposal_id": event.proposal_id,
                "kind": event.kind(),
                "created": receipt.created,
                "reinforced": receipt.reinforced,
                "contradicted": receipt.contradicted,
                "failures": receipt.failures,
            }),
        ));
        Ok(receipt)
    }

    /// Fold one persona's reflection into its observations under the
    /// persona lock
    async fn apply_reflection(
        &self,
        event: &LearningEvent,
        persona_id: &str,
        reflection: Reflection,
        receipt: &mut LearningReceipt,
    ) -> Result<(), CouncilError> {
        let store = self.store.as_ref();
        let policy = self.config.learning;
        let _guard = self.locks.personas.lock(persona_id).await;

        let mut observations: Vec<Observation> =
            store::load_all(store, &RecordFilter::all().eq("persona_id", persona_id)).await?;

        for id in &reflection.contradicts {
            let Some(observation) = observations
                .iter_mut()
                .find(|o| &o.id == id && o.status != ObservationStatus::Deprecated)
            else {
                debug!("{} contradicted unknown observation {}", persona_id, id);
                continue;
            };
            if observation.record_evidence(&event.id, &event.proposal_id, false, policy.min_evidence)? {
                store::save(store, &*observation).await?;
                receipt.contradicted.push(observation.id.clone());
            }
        }

        let Some(candidate) = reflection.candidate else {
            return Ok(());
        };
        // At most one draft per event and persona
        let draft_id = format!("{}-{}", event.id, persona_id);
        if observations.iter().any(|o| o.id == draft_id) {
            debug!("{} already drafted {} for event {}", persona_id, draft_id, event.id);
            receipt.created.push(draft_id);
            return Ok(());
        }
        let matched = best_match(
            &observations,
            persona_id,
            &candidate.pattern,
            policy.similarity_threshold,
        )
        .map(|o| o.id.clone());

        match matched.and_then(|id| observations.iter_mut().find(|o| o.id == id)) {
            Some(observation) => {
                if observation.record_evidence(&event.id, &event.proposal_id, true, policy.min_evidence)? {
                    store::save(store, &*observation).await?;
                    receipt.reinforced.push(observation.id.clone());
                }
            }
            None => {
                let observation =
                    Observation::new_draft(persona_id, &candidate, &event.proposal_id, &event.id)
                        .with_id(draft_id);
                store::save(store, &observation).await?;
                info!("{} drafted observation {}: {}", persona_id, observation.id, observation.pattern);
                receipt.created.push(observation.id);
            }
        }
        Ok(())
    }
}
