//! OpenRouter-compatible chat-completions adapter
//!
//! One request per call: the persona's system prompt becomes the system
//! message and the prompt the user message; the persona's `model` selects
//! the target. Any OpenAI-compatible endpoint works through `base_url`.
//!
//! Timeouts are enforced by the caller per persona, so the HTTP client
//! only carries a connect timeout.

use crate::config::{ConfigError, FileBackendConfig};
use async_trait::async_trait;
use council_application::{GenerationError, TextGenerator};
use council_domain::PersonaConfig;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Characters of an error body kept in error messages
const ERROR_BODY_LIMIT: usize = 300;

/// Text generator over an OpenRouter-compatible HTTP API
pub struct OpenRouterGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    app_name: String,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
}

impl OpenRouterGenerator {
    /// Create a generator from the `[backend]` section.
    ///
    /// Fails when no API key is configured.
    pub fn new(config: &FileBackendConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| ConfigError::MissingApiKey(config.api_key_env.clone()))?;
        Self::with_api_key(config, api_key)
    }

    /// Create a generator with an explicit key, bypassing `[backend]` key lookup.
    ///
    /// An empty key is accepted; every request then fails with a transport
    /// error from the backend.
    pub fn with_api_key(config: &FileBackendConfig, api_key: String) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConfigError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            app_name: config.app_name.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body<'a>(&self, persona: &'a PersonaConfig, prompt: &'a str) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if !persona.system_prompt.trim().is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &persona.system_prompt,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });
        ChatRequest {
            model: &persona.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenRouterGenerator {
    async fn generate(
        &self,
        persona: &PersonaConfig,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        debug!("Requesting {} for persona {}", persona.model, persona.id);

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header("X-Title", &self.app_name)
            .json(&self.request_body(persona, prompt))
            .send()
            .await
            .map_err(|e| GenerationError::Transport(format!("request to {} failed: {}", persona.model, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        extract_content(&body)
    }
}

// ==================== Wire Types ====================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    code: Option<serde_json::Value>,
}

/// Map a non-success status to a failure kind
fn status_error(status: StatusCode, body: &str) -> GenerationError {
    let message = format!("HTTP {}: {}", status.as_u16(), truncate(body));
    if status == StatusCode::TOO_MANY_REQUESTS {
        GenerationError::RateLimit(message)
    } else {
        GenerationError::Transport(message)
    }
}

/// Text of the first choice. OpenRouter can report upstream failures in a
/// 200 response through an `error` object.
fn extract_content(body: &str) -> Result<String, GenerationError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::MalformedOutput(format!("invalid response JSON: {}", e)))?;

    if let Some(error) = response.error {
        let rate_limited = error
            .code
            .as_ref()
            .is_some_and(|code| code.as_u64() == Some(429) || code.as_str() == Some("429"));
        return Err(if rate_limited {
            GenerationError::RateLimit(error.message)
        } else {
            GenerationError::Transport(error.message)
        });
    }

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| GenerationError::MalformedOutput("response contained no message content".to_string()))
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((index, _)) => format!("{}...", &trimmed[..index]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> OpenRouterGenerator {
        OpenRouterGenerator::new(&FileBackendConfig {
            api_key: Some("sk-test".to_string()),
            base_url: "http://localhost:9999/v1/".to_string(),
            max_tokens: Some(800),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_and_missing_key() {
        assert_eq!(generator().endpoint(), "http://localhost:9999/v1/chat/completions");

        let err = OpenRouterGenerator::new(&FileBackendConfig {
            api_key: None,
            api_key_env: "COUNCIL_TEST_NO_SUCH_KEY".to_string(),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::MissingApiKey(ref env) if env == "COUNCIL_TEST_NO_SUCH_KEY"));
    }

    #[test]
    fn test_request_body_carries_system_prompt_and_model() {
        let generator = generator();
        let persona = PersonaConfig::budget();
        let body = serde_json::to_value(generator.request_body(&persona, "Evaluate this")).unwrap();

        assert_eq!(body["model"], "google/gemini-2.0-flash");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Evaluate this");
        assert_eq!(body["max_tokens"], 800);
        assert!(body.get("temperature").is_none());

        let bare = PersonaConfig::new("x", "X", "m");
        let body = serde_json::to_value(generator.request_body(&bare, "hi")).unwrap();
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            GenerationError::RateLimit(_)
        ));
        let err = status_error(StatusCode::BAD_GATEWAY, &"x".repeat(1000));
        match err {
            GenerationError::Transport(message) => {
                assert!(message.starts_with("HTTP 502"));
                assert!(message.len() < 400);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"SCORE: 7"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "SCORE: 7");

        let empty = r#"{"choices":[{"message":{"content":"  "}}]}"#;
        assert!(matches!(extract_content(empty), Err(GenerationError::MalformedOutput(_))));

        assert!(matches!(extract_content("<html>"), Err(GenerationError::MalformedOutput(_))));

        let upstream = r#"{"error":{"message":"provider overloaded","code":429}}"#;
        assert!(matches!(extract_content(upstream), Err(GenerationError::RateLimit(_))));

        let failed = r#"{"error":{"message":"bad model","code":400}}"#;
        assert!(matches!(extract_content(failed), Err(GenerationError::Transport(_))));
    }
}
