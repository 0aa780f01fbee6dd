//! Chat sessions with conversational memory

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::Result;
use crate::types::response::{ChatMessage, ChatResponse};

use super::research::ResearchAgent;

/// Anything that answers questions turn by turn and can forget its history
#[async_trait]
pub trait ChatEngine: Send + Sync {
    /// Answer a message, possibly using earlier turns
    async fn chat(&self, message: &str) -> Result<ChatResponse>;

    /// Forget all earlier turns
    fn reset(&self);
}

/// A research agent plus a memory buffer of the turns so far
pub struct ChatSession {
    agent: Arc<ResearchAgent>,
    memory: Mutex<Vec<ChatMessage>>,
}

impl ChatSession {
    pub fn new(agent: Arc<ResearchAgent>) -> Self {
        Self {
            agent,
            memory: Mutex::new(Vec::new()),
        }
    }

    pub fn agent(&self) -> &ResearchAgent {
        &self.agent
    }

    /// Turns recorded since the last reset
    pub fn history(&self) -> Vec<ChatMessage> {
        self.memory.lock().clone()
    }
}

#[async_trait]
impl ChatEngine for ChatSession {
    async fn chat(&self, message: &str) -> Result<ChatResponse> {
        let history = self.memory.lock().clone();
        let response = self.agent.chat(message, Some(history.as_slice())).await?;

        let mut memory = self.memory.lock();
        memory.push(ChatMessage::user(message));
        memory.push(ChatMessage::assistant(response.text.clone()));

        Ok(response)
    }

    fn reset(&self) {
        self.memory.lock().clear();
    }
}

#[async_trait]
impl ChatEngine for ResearchAgent {
    async fn chat(&self, message: &str) -> Result<ChatResponse> {
        ResearchAgent::chat(self, message, None).await
    }

    fn reset(&self) {}
}
