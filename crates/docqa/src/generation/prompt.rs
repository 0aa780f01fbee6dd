//! Prompt templates for grounded chat

use crate::types::response::{ChatMessage, Citation};

/// Fixed system prompt of the research agent
pub const SYSTEM_PROMPT: &str = "\
You are a Q/A chatbot that answers questions about the provided documents.
Answer only from the context information given to you.
If the context does not contain the answer, say that you cannot answer the question \
from the provided documents and suggest the user consult another source. \
Do not use prior knowledge.
When you answer, finish with the references you used, one per line, \
in the form: <filename>, page <n>";

/// Greeting shown by chat front ends before the first question
pub const GREETING: &str = "Ask me anything about the trained materials";

/// Prompt builder for retrieval-augmented chat
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build context text from retrieved chunks
    pub fn build_context(citations: &[Citation]) -> String {
        let mut context = String::new();

        for (i, citation) in citations.iter().enumerate() {
            context.push_str(&format!("[{}] {}\n", i + 1, citation.format_inline()));
            context.push_str(citation.snippet.trim());
            context.push_str("\n\n");
        }

        context.trim_end().to_string()
    }

    /// System message carrying the fixed prompt and the retrieved context
    pub fn build_system_message(system_prompt: &str, citations: &[Citation]) -> ChatMessage {
        let context = if citations.is_empty() {
            "(no relevant context was found)".to_string()
        } else {
            Self::build_context(citations)
        };

        ChatMessage::system(format!(
            "{}\n\nContext information is below.\n--------------------\n{}\n--------------------",
            system_prompt, context
        ))
    }

    /// Full message list: system + context, prior turns, then the new question
    pub fn build_messages(
        system_prompt: &str,
        citations: &[Citation],
        history: &[ChatMessage],
        message: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Self::build_system_message(system_prompt, citations));
        // The fixed system prompt is never replaced by caller-supplied system turns.
        messages.extend(
            history
                .iter()
                .filter(|m| m.role != crate::types::Role::System)
                .cloned(),
        );
        messages.push(ChatMessage::user(message));
        messages
    }
}
