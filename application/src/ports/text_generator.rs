//! Text generator port
//!
//! Defines the interface for producing a persona's free-text response.

use async_trait::async_trait;
use council_domain::PersonaConfig;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during text generation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("Malformed output: {0}")]
    MalformedOutput(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl GenerationError {
    /// Short failure kind recorded on fallback evaluations
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Transport(_) => "transport",
            GenerationError::RateLimit(_) => "rate_limit",
            GenerationError::MalformedOutput(_) => "malformed_output",
            GenerationError::Timeout(_) => "timeout",
        }
    }
}

/// Backend that answers prompts on behalf of a persona
///
/// The persona's `system_prompt` and `model` select how the request is
/// made; `prompt` is the user turn. Implementations (adapters) live in the
/// infrastructure layer.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        persona: &PersonaConfig,
        prompt: &str,
    ) -> Result<String, GenerationError>;
}
