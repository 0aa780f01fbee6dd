//! LLM provider trait for chat completion

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::Result;
use crate::types::response::ChatMessage;

/// Incremental text produced by a streaming completion
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Trait for chat-style language model backends
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (llama3, mistral, phi3, ...)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate the assistant reply to a conversation
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Single-prompt completion
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.chat(&[ChatMessage::user(prompt)]).await
    }

    /// Stream the assistant reply as text increments
    ///
    /// Default implementation yields the whole `chat` reply as one increment.
    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        let text = self.chat(messages).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
