use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AssistantError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

/// Anything that turns a prompt into a completion.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: 0.3,
            max_tokens: None,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatRequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for a hosted, OpenAI-compatible chat-completions endpoint (Groq by default).
pub struct LLM {
    client: Client,
    api_key: String,
    config: LLMConfig,
}

impl LLM {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AssistantError::Config("GROQ_API_KEY is not set".into()))?;

        Ok(LLM {
            client: Client::new(),
            api_key,
            config,
        })
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }
}

#[async_trait]
impl LanguageModel for LLM {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(AssistantError::InvalidInput("prompt cannot be empty".into()));
        }

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatRequestMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        debug!("POST {} model={}", url, self.config.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Model(format!("API returned {}: {}", status, body)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Model(format!("malformed response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AssistantError::Model("response contained no message content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn config_for(server: &mockito::Server) -> LLMConfig {
        LLMConfig {
            base_url: server.url(),
            api_key: Some("gsk_test".to_string()),
            ..LLMConfig::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            LLM::new(LLMConfig::default()),
            Err(AssistantError::Config(_))
        ));
        let blank = LLMConfig {
            api_key: Some("  ".to_string()),
            ..LLMConfig::default()
        };
        assert!(LLM::new(blank).is_err());
    }

    #[tokio::test]
    async fn test_complete_sends_prompt_and_temperature() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer gsk_test")
            .match_body(Matcher::PartialJson(json!({
                "model": DEFAULT_MODEL,
                "temperature": 0.3,
                "messages": [{"role": "user", "content": "Why is my fan loud?"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{"message": {"role": "assistant", "content": "Check the vents."}}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let llm = LLM::new(config_for(&server)).unwrap();
        let answer = llm.complete("Why is my fan loud?").await.unwrap();

        mock.assert_async().await;
        assert_eq!(answer, "Check the vents.");
    }

    #[tokio::test]
    async fn test_error_status_is_model_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let llm = LLM::new(config_for(&server)).unwrap();
        let err = llm.complete("hello").await.unwrap_err();
        assert!(matches!(err, AssistantError::Model(ref msg) if msg.contains("overloaded")));
    }

    #[tokio::test]
    async fn test_missing_choices_is_model_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let llm = LLM::new(config_for(&server)).unwrap();
        assert!(matches!(
            llm.complete("hello").await,
            Err(AssistantError::Model(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected() {
        let llm = LLM::new(LLMConfig {
            api_key: Some("k".to_string()),
            ..LLMConfig::default()
        })
        .unwrap();
        assert!(matches!(
            llm.complete("   ").await,
            Err(AssistantError::InvalidInput(_))
        ));
    }
}
