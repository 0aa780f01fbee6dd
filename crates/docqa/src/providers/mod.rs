//! Provider abstractions for embeddings and chat models
//!
//! Trait objects keep the pipeline independent of the backend; Ollama is the
//! bundled implementation.

pub mod embedding;
pub mod llm;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use llm::{LlmProvider, TextStream};
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm, OllamaProvider};
