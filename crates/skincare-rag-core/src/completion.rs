//! Completion provider trait.
//!
//! The language model is an external capability: it takes a prompt and
//! returns free text. Nothing about the returned text is trusted; see
//! [`crate::response`] for how it is turned into a typed result.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Model identifier, used in logs.
    fn model_name(&self) -> &str;
    /// Send `prompt` as a single user turn and return the model's text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
