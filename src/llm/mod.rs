use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

pub mod openai_compat;

pub use openai_compat::OpenAiCompatClient;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a conversation with an optional system prompt and return the reply text
    async fn send_message_with_system(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
    ) -> Result<String>;

    async fn send_message(&self, messages: &[Message]) -> Result<String> {
        self.send_message_with_system(messages, None).await
    }
}

/// Create the client for the configured provider
pub fn create_client(config: &LlmConfig) -> Box<dyn LlmClient> {
    let base_url = config.base_url();
    tracing::info!("Using {:?} planner at {}", config.provider, base_url);
    Box::new(OpenAiCompatClient::new(
        base_url,
        config.model.clone(),
        config.max_tokens,
        config.resolve_api_key(),
    ))
}
