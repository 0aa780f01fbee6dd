//! docqa: document question answering with grounded, cited answers
//!
//! Ingests PDF and Word documents, splits them into semantically coherent
//! chunks, indexes their embeddings on disk and serves a research agent that
//! answers only from retrieved context. A batch evaluator scores the agent's
//! answers for relevancy, faithfulness and correctness.

pub mod agent;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod logging;
pub mod providers;
pub mod server;
pub mod types;

pub use agent::{ChatEngine, ChatSession, ResearchAgent};
pub use config::RagConfig;
pub use error::{Error, Result};
pub use evaluation::{EvalDataset, EvaluationReport, Metric, ResponseEvaluator};
pub use index::VectorIndex;
pub use ingestion::Vectorizer;
pub use types::{
    document::{Chunk, ChunkSource, Document, FileType},
    response::{ChatMessage, ChatResponse, Citation},
};
