use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while assembling configuration or adapters from it
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    #[error("API key not set (expected environment variable {0})")]
    MissingApiKey(String),

    #[error("Could not initialize text-generation backend: {0}")]
    Backend(String),

    #[error("Could not open data directory {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Invalid(Box::new(e))
    }
}
