//! Vote & decide subdomain
//!
//! Aggregation of final evaluations into a [`Decision`], consensus
//! strength, and the routing policy that auto-executes or escalates.

pub mod consensus;
pub mod entities;
pub mod routing;
pub mod summary;

pub use consensus::{ConsensusOutcome, Vote};
pub use entities::{Decision, DecisionStatus, HumanDecision};
pub use routing::{RoutingContext, RoutingOutcome, RoutingRule, RoutingThresholds, route};
pub use summary::{key_points, summarize};
