//! Chat model client.
//!
//! One synchronous chat-completions call per prompt against an
//! OpenAI-compatible endpoint, at low temperature. No retry policy: a
//! provider failure surfaces to the caller with the underlying message.

use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::config::LlmConfig;

pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl ChatClient {
    /// Build the client from configuration. The API key is read from the
    /// environment variable named by `llm.api_key_env`; a missing key fails
    /// here, at startup, rather than on the first query.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.api_key_env))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
        })
    }

    /// Send `prompt` as a single user message and return the model's text.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "user", "content": prompt }
            ],
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Chat API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response
            .json()
            .await
            .context("Chat completion response was not JSON")?;

        extract_answer(&json)
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response.
fn extract_answer(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Chat response contained no choices"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice_content() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "Gradients point uphill." } },
                { "message": { "role": "assistant", "content": "ignored" } },
            ]
        });
        assert_eq!(extract_answer(&json).unwrap(), "Gradients point uphill.");
    }

    #[test]
    fn missing_choices_is_an_error() {
        let json = serde_json::json!({ "choices": [] });
        assert!(extract_answer(&json).is_err());

        let json = serde_json::json!({ "error": { "message": "rate limited" } });
        assert!(extract_answer(&json).is_err());
    }
}
