//! Deliberation subdomain
//!
//! Personas review anonymized peer evaluations and may revise their stance.

pub mod anonymize;
pub mod entities;
pub mod parsing;

pub use anonymize::{PeerBundle, PeerView, peer_bundle};
pub use entities::{
    DeliberationPolicy, DeliberationRecord, DeliberationRound, DeliberationTrigger, PersonaTurn,
};
pub use parsing::{DeclaredPosition, ParsedDeliberation, parse_deliberation_response};
