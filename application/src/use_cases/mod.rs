//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod confirm_team;
pub mod council;
pub mod error;
pub mod learn;
pub mod locks;
pub mod manage_observations;
pub mod record_decision;
pub mod record_outcome;
pub mod run_council;
pub(crate) mod shared;

#[cfg(test)]
pub(crate) mod testing;
