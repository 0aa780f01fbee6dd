//! Document ingestion: parsing, loading, splitting and indexing

pub mod keywords;
pub mod loader;
pub mod parser;
pub mod pipeline;
pub mod splitter;
pub mod vectorizer;

pub use keywords::KeywordExtractor;
pub use loader::DocumentLoader;
pub use parser::FileParser;
pub use pipeline::{Stage, TransformFailure, TransformOutput, TransformationPipeline};
pub use splitter::SemanticSplitter;
pub use vectorizer::Vectorizer;
