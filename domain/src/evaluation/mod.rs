//! Evaluation subdomain
//!
//! One persona's structured assessment of one proposal, the ordered
//! recommendation scale, and tolerant parsing of free-text responses.

pub mod entities;
pub mod parsing;
pub mod recommendation;

pub use entities::{
    Evaluation, EvaluationSet, MAX_SCORE, MIN_SCORE, NEUTRAL_SCORE, PositionChange, Revision,
    Stance,
};
pub use parsing::{ParsedEvaluation, parse_evaluation_response};
pub use recommendation::{Confidence, Recommendation, Side};
