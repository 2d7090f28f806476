//! Completion provider implementations.
//!
//! - **[`OpenAICompletionProvider`]** speaks the chat completions API at a
//!   configurable base URL, so any OpenAI-compatible endpoint (OpenRouter,
//!   a local gateway) works.
//! - **[`AnthropicCompletionProvider`]** speaks the messages API.
//!
//! Both send the prompt as a single user message and retry transient
//! failures through [`crate::http::send_json_with_retry`].

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use skincare_rag_core::completion::CompletionProvider;

use crate::config::LlmConfig;
use crate::http::{client_with_timeout, send_json_with_retry};

const ANTHROPIC_VERSION: &str = "2023-06-01";

fn api_key(config: &LlmConfig) -> Result<String> {
    let var = config.api_key_var();
    std::env::var(var)
        .map(|k| k.trim().to_string())
        .map_err(|_| anyhow::anyhow!("{} environment variable not set", var))
}

// ============ OpenAI-compatible Provider ============

pub struct OpenAICompletionProvider {
    model: String,
    endpoint: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAICompletionProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Self::with_api_key(config, api_key(config)?)
    }

    pub fn with_api_key(config: &LlmConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url()),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            client: client_with_timeout(config.timeout_secs)?,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionProvider for OpenAICompletionProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let json = send_json_with_retry("chat completions API", self.max_retries, || {
            self.client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;

        let parsed: ChatResponse =
            serde_json::from_value(json).context("failed to parse chat completions response")?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        if answer.trim().is_empty() {
            bail!("chat completions response missing message content");
        }
        Ok(answer)
    }
}

// ============ Anthropic Provider ============

pub struct AnthropicCompletionProvider {
    model: String,
    endpoint: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    client: reqwest::Client,
}

impl AnthropicCompletionProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Self::with_api_key(config, api_key(config)?)
    }

    pub fn with_api_key(config: &LlmConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            endpoint: format!("{}/v1/messages", config.base_url()),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            client: client_with_timeout(config.timeout_secs)?,
        })
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<AnthropicContentBlock<'a>>,
}

#[derive(Serialize)]
struct AnthropicContentBlock<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[async_trait]
impl CompletionProvider for AnthropicCompletionProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![AnthropicMessage {
                role: "user",
                content: vec![AnthropicContentBlock {
                    kind: "text",
                    text: prompt,
                }],
            }],
        };
        let json = send_json_with_retry("Anthropic messages API", self.max_retries, || {
            self.client
                .post(&self.endpoint)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
        })
        .await?;

        let parsed: AnthropicResponse =
            serde_json::from_value(json).context("failed to parse Anthropic response")?;
        let answer = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicResponseBlock::Text { text } => Some(text),
                AnthropicResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        if answer.is_empty() {
            bail!("Anthropic response missing text content");
        }
        Ok(answer)
    }
}

/// Create the configured [`CompletionProvider`].
pub fn create_completion(config: &LlmConfig) -> Result<Arc<dyn CompletionProvider>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAICompletionProvider::new(config)?)),
        "anthropic" => Ok(Arc::new(AnthropicCompletionProvider::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}
