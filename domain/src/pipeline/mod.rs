//! Pipeline subdomain
//!
//! The four ordered stages of a council run and the lifecycle events a
//! streaming run emits.

pub mod event;
pub mod stage;

pub use event::{EventKind, PipelineEvent};
pub use stage::Stage;
