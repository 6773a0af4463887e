//! LLM text-generation collaborator
//!
//! The agents only ever see `generate(prompt) -> String`; API failures
//! surface as an error-tagged string rather than an `Err`, so a failed
//! completion can flow through the same channels as a successful one.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::config::Settings;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the prompt. Never fails loudly: an API
    /// error comes back as an error-tagged string.
    async fn generate(&self, prompt: &str) -> String;
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: settings.anthropic_api_key.clone().unwrap_or_default(),
            model: settings.claude_model.clone(),
            max_tokens: settings.max_tokens,
        }
    }

    async fn request(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(anyhow!("ANTHROPIC_API_KEY is not configured"));
        }

        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let payload: serde_json::Value = response.json().await?;
        payload["content"][0]["text"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| anyhow!("Unexpected completion payload shape"))
    }
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    async fn generate(&self, prompt: &str) -> String {
        match self.request(prompt).await {
            Ok(text) => text,
            Err(e) => {
                log::error!("LLM invocation failed: {}", e);
                format!("Error generating response: {}", e)
            }
        }
    }
}
