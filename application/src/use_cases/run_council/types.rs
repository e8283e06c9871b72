//! Input, output and error types of the council pipeline

use crate::ports::store::StoreError;
use council_domain::{
    Decision, DeliberationRecord, DomainError, EntityProfile, Evaluation, Proposal, Stage,
};
use thiserror::Error;

/// Errors that end a pipeline run
#[derive(Error, Debug)]
pub enum RunCouncilError {
    /// Stage 1 could not produce valid structured details
    #[error("Invalid proposal: {0}")]
    InvalidProposal(DomainError),

    /// A stage produced nothing usable (e.g. every persona failed)
    #[error("{stage} failed: {reason}")]
    StageFailed { stage: Stage, reason: String },

    #[error("Storage error during {stage}: {source}")]
    Store {
        stage: Stage,
        #[source]
        source: StoreError,
    },
}

impl RunCouncilError {
    pub fn stage(&self) -> Stage {
        match self {
            RunCouncilError::InvalidProposal(_) => Stage::Contextualize,
            RunCouncilError::StageFailed { stage, .. } => *stage,
            RunCouncilError::Store { stage, .. } => *stage,
        }
    }

    pub(super) fn store(stage: Stage) -> impl FnOnce(StoreError) -> Self {
        move |source| RunCouncilError::Store { stage, source }
    }
}

/// Input for the RunCouncil use case
#[derive(Debug, Clone)]
pub struct RunCouncilInput {
    /// Free-text application or a JSON document with the structured fields
    pub content: String,
}

impl RunCouncilInput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Everything the pipeline produced for one proposal
#[derive(Debug, Clone)]
pub struct RunCouncilOutput {
    pub proposal: Proposal,
    pub evaluations: Vec<Evaluation>,
    pub deliberation: DeliberationRecord,
    pub decision: Decision,
}

/// Stage 1 result
#[derive(Debug, Clone)]
pub(super) struct Contextualized {
    pub proposal: Proposal,
    /// The linked team profile, if the match is not ambiguous
    pub team: Option<EntityProfile>,
}

/// Stage 2 result
#[derive(Debug, Clone)]
pub(super) struct Evaluated {
    pub context: Contextualized,
    pub evaluations: Vec<Evaluation>,
}

/// Stage 3 result
#[derive(Debug, Clone)]
pub(super) struct Deliberated {
    pub evaluated: Evaluated,
    pub deliberation: DeliberationRecord,
}
