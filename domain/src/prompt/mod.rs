//! Prompt domain
//!
//! Templates for every text-generation request the council makes.

mod template;

pub use template::{EvaluationContext, PromptTemplate};
