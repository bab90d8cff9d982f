use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use haulbot_agent::llm::LlmClient;
use haulbot_core::config::LlmConfig;

const SYSTEM_PROMPT: &str =
    "You are HaulBot, a freight rate assistant for verified trucking carriers. \
     You help carriers phrase complete load details. You never quote prices, \
     never verify carriers, and keep replies to a few sentences.";

/// OpenAI-compatible chat-completions client behind the assist seam. One
/// request, bounded token budget, no retries; the extractor absorbs failures.
pub struct ChatCompletionsAssist {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

impl ChatCompletionsAssist {
    pub fn new(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl LlmClient for ChatCompletionsAssist {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": prompt },
                ],
                "max_tokens": self.max_tokens,
                "temperature": 0.5,
            }))
            .send()
            .await
            .context("assist request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("assist service returned {status}"));
        }

        let completion: CompletionResponse =
            response.json().await.context("assist payload could not be decoded")?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| anyhow!("assist service returned no choices"))
    }
}
