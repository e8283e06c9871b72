//! Infrastructure layer for grants-council
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod providers;
pub mod store;

// Re-export commonly used types
pub use config::{
    ConfigError, ConfigLoader, FileBackendConfig, FileConfig, FileLoggingConfig, FileOutputConfig,
    FileOutputFormat, FilePersonaConfig, FileStorageConfig,
};
pub use logging::JsonlTranscriptLogger;
pub use providers::OpenRouterGenerator;
pub use store::JsonFileStore;
