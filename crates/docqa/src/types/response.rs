//! Chat message and response types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::Chunk;

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
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

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A retrieved chunk used as context for an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Source filename
    pub filename: String,
    /// Page number (if applicable)
    pub page_number: Option<u32>,
    /// Full chunk text given to the model
    pub snippet: String,
    /// Keywords extracted for the chunk
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Cosine similarity to the question
    pub similarity_score: f32,
}

impl Citation {
    /// Create a citation from a chunk and similarity score
    pub fn from_chunk(chunk: &Chunk, similarity_score: f32) -> Self {
        Self {
            chunk_id: chunk.id,
            filename: chunk.source.filename.clone(),
            page_number: chunk.source.page_number,
            snippet: chunk.content.clone(),
            keywords: chunk.keywords.clone(),
            similarity_score,
        }
    }

    /// Format citation as `<filename>, page <n>`
    pub fn format_inline(&self) -> String {
        match self.page_number {
            Some(page) => format!("{}, page {}", self.filename, page),
            None => self.filename.clone(),
        }
    }
}

/// Answer from the research agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated answer
    pub text: String,
    /// Context chunks retrieved for this answer, most similar first
    pub citations: Vec<Citation>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl ChatResponse {
    pub fn new(text: String, citations: Vec<Citation>, processing_time_ms: u64) -> Self {
        Self {
            text,
            citations,
            processing_time_ms,
        }
    }

    /// Retrieved chunk texts, in retrieval order
    pub fn contexts(&self) -> Vec<String> {
        self.citations.iter().map(|c| c.snippet.clone()).collect()
    }

    /// Retrieved sources the answer text actually refers to
    pub fn referenced_citations(&self) -> Vec<Citation> {
        crate::generation::citation::referenced_citations(&self.text, &self.citations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let msg = ChatMessage::assistant("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
    }

    #[test]
    fn test_format_inline() {
        let citation = Citation {
            chunk_id: Uuid::new_v4(),
            filename: "manual.pdf".into(),
            page_number: Some(2),
            snippet: "text".into(),
            keywords: vec![],
            similarity_score: 0.9,
        };
        assert_eq!(citation.format_inline(), "manual.pdf, page 2");
    }
}
