//! Port definitions (interfaces for external adapters)
//!
//! Ports define the boundaries between the application layer and the
//! infrastructure layer.

pub mod progress;
pub mod store;
pub mod text_generator;
pub mod transcript_logger;
