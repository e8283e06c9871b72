//! Domain layer for grants-council
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Council
//!
//! A panel of reviewer personas evaluates each proposal in four ordered
//! stages:
//!
//! 1. **Contextualize**: structured extraction and team matching
//! 2. **Evaluate**: independent per-persona scoring
//! 3. **Deliberate**: anonymized peer review and optional revision
//! 4. **Decide**: vote aggregation, consensus strength and routing
//!
//! ## Learning
//!
//! Human overrides and recorded outcomes produce persona reflections that
//! accumulate into [`Observation`]s. Observations influence future
//! evaluations only once a human approves them.

pub mod config;
pub mod core;
pub mod decision;
pub mod deliberation;
pub mod evaluation;
pub mod learning;
pub mod persona;
pub mod pipeline;
pub mod prompt;
pub mod proposal;
pub mod team;

// Re-export commonly used types
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use core::error::DomainError;
pub use decision::{
    ConsensusOutcome, Decision, DecisionStatus, HumanDecision, RoutingContext, RoutingOutcome,
    RoutingRule, RoutingThresholds, Vote, route,
};
pub use deliberation::{
    DeliberationPolicy, DeliberationRecord, DeliberationRound, DeliberationTrigger, PeerBundle,
    PeerView, PersonaTurn, parse_deliberation_response, peer_bundle,
};
pub use evaluation::{
    Confidence, Evaluation, EvaluationSet, PositionChange, Recommendation, Side,
    parse_evaluation_response,
};
pub use learning::{
    CandidatePattern, LearningEvent, LearningPolicy, LearningReceipt, LearningTrigger,
    Observation, ObservationStatus, Outcome, OutcomeResult, Reflection, best_match,
    parse_reflection, select_for_prompt,
};
pub use persona::PersonaConfig;
pub use pipeline::{EventKind, PipelineEvent, Stage};
pub use prompt::{EvaluationContext, PromptTemplate};
pub use proposal::{Proposal, ProposalDetails, ProposalStatus, SimilarProposal};
pub use team::{EntityMatch, EntityProfile, MatchTier, MatchingThresholds, match_entity};
