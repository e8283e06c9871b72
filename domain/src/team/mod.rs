//! Team identity subdomain
//!
//! Durable [`EntityProfile`]s and the tiered matching heuristic that links
//! proposals to returning applicants.

pub mod matching;
pub mod profile;

pub use matching::{EntityMatch, MatchTier, MatchingThresholds, match_entity};
pub use profile::EntityProfile;
