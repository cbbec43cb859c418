//! Groq LLM Provider
//!
//! Implementation of `LlmProvider` for Groq's OpenAI-compatible
//! chat-completions API. Any endpoint speaking the same protocol (a local
//! Ollama's `/v1`, vLLM, ...) works by pointing `GROQ_BASE_URL` at it.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::Message,
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, TokenUsage},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Groq provider configuration
#[derive(Clone)]
pub struct ProviderConfig {
    /// Bearer token
    pub api_key: String,

    /// API root, without the `/chat/completions` suffix
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Read `GROQ_API_KEY`, `GROQ_BASE_URL` and `LLM_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AgentError::Config("GROQ_API_KEY is not set".into()))?;
        let base_url = std::env::var("GROQ_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            api_key,
            base_url,
            timeout_secs,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Groq (OpenAI-compatible) provider
pub struct GroqProvider {
    client: Client,
    config: ProviderConfig,
}

impl GroqProvider {
    /// Create from configuration
    pub fn from_config(config: ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| AgentError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(ProviderConfig::from_env()?)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn build_request<'a>(messages: &'a [Message], options: &'a GenerationOptions) -> ChatRequest<'a> {
        ChatRequest {
            model: &options.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        }
    }

    fn convert_completion(response: ChatResponse, requested_model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Parse("No choices in response".into()))?;

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            model: response.model.unwrap_or_else(|| requested_model.to_string()),
            usage: response
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_api),
        })
    }
}

/// Map a non-success HTTP status to an error
fn status_error(status: StatusCode, body: &str) -> AgentError {
    let detail = format!("{}: {}", status.as_u16(), body.chars().take(500).collect::<String>());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(detail),
        s if s.is_server_error() => AgentError::ProviderUnavailable(detail),
        _ => AgentError::Provider(detail),
    }
}

fn transport_error(e: &reqwest::Error, timeout_secs: u64) -> AgentError {
    if e.is_timeout() {
        AgentError::Timeout(timeout_secs)
    } else if e.is_connect() {
        AgentError::ProviderUnavailable(format!("Connection failed: {}", e))
    } else {
        AgentError::Provider(format!("Request failed: {}", e))
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        "Groq"
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self.client
            .get(self.url("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => Ok(true),
            Ok(r) => {
                tracing::warn!(status = %r.status(), "Groq health check failed");
                Ok(false)
            }
            Err(e) => {
                tracing::warn!("Groq health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = Self::build_request(messages, options);

        let response = self.client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.config.timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&e, self.config.timeout_secs))?;

        if !status.is_success() {
            tracing::warn!(status = %status, model = %options.model, "Completion request rejected");
            return Err(status_error(status, &body));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| AgentError::Parse(format!("Failed to parse response: {}", e)))?;

        Self::convert_completion(parsed, &options.model)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ProviderConfig::new("sk-secret");
        assert_eq!(config.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.timeout_secs, 60);
        assert!(!format!("{:?}", config).contains("sk-secret"));
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![Message::system("You are a calculator."), Message::user("2+2")];
        let options = GenerationOptions::default().with_max_tokens(5000);

        let json = serde_json::to_value(GroqProvider::build_request(&messages, &options)).unwrap();

        assert_eq!(json["model"], "llama-3.3-70b-versatile");
        assert_eq!(json["max_tokens"], 5000);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "2+2");
    }

    #[test]
    fn test_response_conversion() {
        let body = r#"{
            "id": "chatcmpl-1",
            "model": "llama-3.3-70b-versatile",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{'answer': '4'}"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 50, "total_tokens": 60}
        }"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();

        let completion = GroqProvider::convert_completion(response, "fallback-model").unwrap();

        assert_eq!(completion.content, "{'answer': '4'}");
        assert_eq!(completion.model, "llama-3.3-70b-versatile");
        assert_eq!(completion.usage, Some(TokenUsage::new(10, 50)));
        assert_eq!(completion.finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn test_oversized_usage_is_accepted() {
        let body = r#"{
            "choices": [{"message": {"content": "{'answer': '0'}"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 4294967295, "completion_tokens": 4294967295}
        }"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();

        let completion = GroqProvider::convert_completion(response, "m").unwrap();

        let usage = completion.usage.unwrap();
        assert_eq!(usage.total_tokens, u32::MAX);
        assert_eq!(completion.model, "m");
    }

    #[test]
    fn test_empty_choices_is_parse_error() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = GroqProvider::convert_completion(response, "m").unwrap_err();
        assert!(matches!(err, AgentError::Parse(_)));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(status_error(StatusCode::UNAUTHORIZED, ""), AgentError::Auth(_)));
        assert!(matches!(status_error(StatusCode::TOO_MANY_REQUESTS, ""), AgentError::RateLimited(_)));
        assert!(matches!(status_error(StatusCode::BAD_GATEWAY, ""), AgentError::ProviderUnavailable(_)));
        assert!(matches!(status_error(StatusCode::BAD_REQUEST, "bad"), AgentError::Provider(_)));
    }

    #[test]
    fn test_url_joining() {
        let provider = GroqProvider::from_config(
            ProviderConfig::new("k").with_base_url("http://localhost:11434/v1/"),
        )
        .unwrap();
        assert_eq!(provider.url("chat/completions"), "http://localhost:11434/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let provider = GroqProvider::from_config(
            ProviderConfig::new("k").with_base_url("http://127.0.0.1:9"),
        )
        .unwrap();

        assert!(!provider.health_check().await.unwrap());
        let err = provider
            .complete(&[Message::user("hi")], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ProviderUnavailable(_) | AgentError::Provider(_)));
    }
}
