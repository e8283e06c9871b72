//! Runtime sections from TOML (`[backend]`, `[storage]`, `[logging]`, `[output]`)

use council_domain::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// OpenRouter-compatible chat-completions backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendConfig {
    /// Base URL; `/chat/completions` is appended
    pub base_url: String,
    /// Environment variable name for the API key (default: "OPENROUTER_API_KEY").
    pub api_key_env: String,
    /// Direct API key (not recommended; use the env var instead).
    pub api_key: Option<String>,
    /// Default per-call timeout; personas may override it
    pub request_timeout_secs: u64,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    /// Sent as the `X-Title` header
    pub app_name: String,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            api_key: None,
            request_timeout_secs: council_application::DEFAULT_REQUEST_TIMEOUT.as_secs(),
            max_tokens: None,
            temperature: None,
            app_name: "grants-council".to_string(),
        }
    }
}

impl FileBackendConfig {
    /// The configured key, else the value of `api_key_env`
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Record store location (`[storage]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// One sub-directory per record collection is created below it
    pub data_dir: PathBuf,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Log destinations (`[logging]`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for daily-rotated diagnostic logs
    pub file_dir: Option<PathBuf>,
    /// JSONL transcript of every prompt and response
    pub transcript: Option<PathBuf>,
}

/// Rendering defaults (`[output]`); command-line flags take precedence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    pub format: Option<OutputFormat>,
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_defaults() {
        let backend = FileBackendConfig::default();
        assert!(backend.base_url.contains("openrouter.ai"));
        assert_eq!(backend.request_timeout_secs, 120);
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let backend = FileBackendConfig {
            api_key: Some("sk-test".to_string()),
            api_key_env: "COUNCIL_TEST_UNSET_KEY_VARIABLE".to_string(),
            ..Default::default()
        };
        assert_eq!(backend.resolve_api_key().as_deref(), Some("sk-test"));

        let blank = FileBackendConfig {
            api_key: Some("  ".to_string()),
            api_key_env: "COUNCIL_TEST_UNSET_KEY_VARIABLE".to_string(),
            ..Default::default()
        };
        assert_eq!(blank.resolve_api_key(), None);
    }
}
