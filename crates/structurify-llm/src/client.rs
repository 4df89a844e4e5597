use crate::types::*;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Ask the provider for a bare JSON object (`response_format`).
    pub json_mode: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            // Groq's OpenAI-compatible endpoint
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(0.2),
            max_tokens: Some(4096),
            json_mode: true,
        }
    }
}

impl LlmConfig {
    /// An API key that is present and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// Anything that can answer a chat completion. `LlmClient` talks HTTP; tests
/// substitute scripted backends.
pub trait ChatBackend {
    fn model_name(&self) -> &str;

    /// Whether a credential is configured. Checked before any request is sent.
    fn has_credentials(&self) -> bool {
        true
    }

    fn chat(
        &self,
        messages: Vec<Message>,
        response_format: Option<ResponseFormat>,
    ) -> impl Future<Output = Result<ChatResponse>> + Send;
}

pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut LlmConfig {
        &mut self.config
    }
}

impl ChatBackend for LlmClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn has_credentials(&self) -> bool {
        self.config.api_key().is_some()
    }

    async fn chat(
        &self,
        messages: Vec<Message>,
        response_format: Option<ResponseFormat>,
    ) -> Result<ChatResponse> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            response_format,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!("LLM request to {}: {} messages", url, request.messages.len());

        let mut req_builder = self.http.post(&url).json(&request);

        if let Some(api_key) = self.config.api_key() {
            req_builder = req_builder.bearer_auth(api_key);
        }

        let response = req_builder
            .send()
            .await
            .context("Failed to reach the AI service; check your network connection")?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            anyhow::bail!("The AI service rejected the API key ({}); it is missing or invalid", status);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("AI request failed ({}): {}", status, error_text);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to decode the AI service response")?;

        info!(
            "LLM response: model={}, finish_reason={:?}, total_tokens={:?}",
            self.config.model,
            chat_response
                .choices
                .first()
                .and_then(|c| c.finish_reason.as_ref()),
            chat_response.usage.as_ref().map(|u| u.total_tokens)
        );

        Ok(chat_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_groq_with_json_mode() {
        let config = LlmConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.json_mode);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut client = LlmClient::new(LlmConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        });
        assert!(!client.has_credentials());
        client.config_mut().api_key = Some("gsk_test".to_string());
        assert!(client.has_credentials());
        assert_eq!(client.model_name(), DEFAULT_MODEL);
    }
}
