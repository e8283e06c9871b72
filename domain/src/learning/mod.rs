//! Learning subdomain
//!
//! Feedback events (human overrides, recorded outcomes) trigger persona
//! reflections. A reflection may propose a pattern that either reinforces
//! an existing [`Observation`] or becomes a new draft. Observations reach
//! evaluation prompts only after explicit approval.

pub mod event;
pub mod observation;
pub mod outcome;
pub mod reflection;

pub use event::{LearningEvent, LearningReceipt, LearningTrigger};
pub use observation::{LearningPolicy, Observation, ObservationStatus, best_match, select_for_prompt};
pub use outcome::{Outcome, OutcomeResult};
pub use reflection::{CandidatePattern, Reflection, parse_reflection};
