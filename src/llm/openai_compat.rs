//! Client for any server implementing the OpenAI chat completions API
//! (OpenAI itself, Ollama's compatibility mode, vLLM, LM Studio, ...).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{LlmClient, Message};

pub struct OpenAiCompatClient {
    base_url: String,
    model: String,
    max_tokens: usize,
    /// Optional; self-hosted servers often need none
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: String,
        model: String,
        max_tokens: usize,
        api_key: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_tokens,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn send_message_with_system(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
    ) -> Result<String> {
        let mut all_messages = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = system_prompt {
            all_messages.push(Message::system(system));
        }
        all_messages.extend_from_slice(messages);

        let request = ChatRequest {
            model: &self.model,
            messages: all_messages,
            max_tokens: self.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);

        let mut req = self.client.post(&url);
        if let Some(ref api_key) = self.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = req
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error ({}): {}", status, error_text);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse LLM API response")?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| anyhow::anyhow!("No response content from LLM API"))
    }
}
