//! Text-generation backends
//!
//! Adapters implementing the application's
//! [`TextGenerator`](council_application::TextGenerator) port.

mod openrouter;

pub use openrouter::OpenRouterGenerator;
