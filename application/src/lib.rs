//! Application layer for grants-council
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{CouncilConfig, DEFAULT_REQUEST_TIMEOUT};
pub use ports::{
    progress::{NoProgress, ProgressNotifier},
    store::{Collection, CouncilStore, RecordFilter, StoreError, StoredRecord},
    text_generator::{GenerationError, TextGenerator},
    transcript_logger::{NoTranscriptLogger, TranscriptEvent, TranscriptLogger},
};
pub use use_cases::council::{Council, LearningEventView, ProposalView};
pub use use_cases::error::CouncilError;
pub use use_cases::learn::{LearningBatch, ProcessLearningUseCase};
pub use use_cases::record_decision::{RecordDecisionInput, RecordDecisionOutput};
pub use use_cases::run_council::{
    RunCouncilError, RunCouncilInput, RunCouncilOutput, RunCouncilUseCase,
};
