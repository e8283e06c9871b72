//! Configuration file loading for grants-council
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `COUNCIL_*` environment variables (`__` separates nested keys)
//! 2. `--config <path>` specified file
//! 3. Project root: `./council.toml` or `./.council.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/grants-council/config.toml`
//! 5. Default values

mod error;
mod file_config;
mod loader;

pub use error::ConfigError;
pub use file_config::{
    FileBackendConfig, FileConfig, FileDeliberationConfig, FileLearningConfig,
    FileLoggingConfig, FileMatchingConfig, FileOutputConfig, FileOutputFormat, FilePersonaConfig,
    FileRoutingConfig, FileStorageConfig,
};
pub use loader::ConfigLoader;
