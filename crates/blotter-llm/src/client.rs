//! OpenAI-compatible chat-completions client
//!
//! Targets OpenRouter by default but works against any endpoint speaking
//! the same wire format. Failures map to `ModelUnavailable` so the pipeline
//! can degrade a record instead of aborting the batch.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use blotter_core::{BlotterError, LlmConfig, ModelClient, Result};

/// Chat-completions API client
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

const SYSTEM_PROMPT: &str = "You are a strict JSON extraction assistant.";

impl OpenRouterClient {
    /// Create a new client
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BlotterError::ModelUnavailable(format!("client build failed: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            max_tokens,
            temperature,
        })
    }

    /// Create from config; the API key must be present
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key.as_ref().ok_or_else(|| {
            BlotterError::ConfigError("model API key required".to_string())
        })?;

        Self::new(
            api_key.clone(),
            config.base_url.clone(),
            config.model.clone(),
            config.max_tokens,
            config.temperature,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait::async_trait]
impl ModelClient for OpenRouterClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| BlotterError::ModelUnavailable(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BlotterError::ModelUnavailable(format!(
                "endpoint returned {status}: {body}"
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| BlotterError::ModelUnavailable(format!("malformed response: {e}")))?;

        result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| BlotterError::ModelUnavailable("no completion returned".to_string()))
    }

    fn name(&self) -> &str {
        "openrouter"
    }
}
