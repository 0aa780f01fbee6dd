//! Transformation pipeline: semantic splitting, then keyword extraction
//!
//! Work is best effort. A page that cannot be split is skipped and a chunk
//! whose keywords cannot be extracted is kept without keywords. Every skipped
//! unit is logged and reported in [`TransformOutput::failures`].

use std::sync::Arc;
use std::time::Instant;

use crate::providers::EmbeddingProvider;
use crate::types::{Chunk, Document};

use super::keywords::KeywordExtractor;
use super::splitter::SemanticSplitter;

/// Pipeline stage a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Split,
    Keywords,
}

/// A unit of work that was skipped
#[derive(Debug, Clone)]
pub struct TransformFailure {
    pub stage: Stage,
    /// `<filename>` or `<filename>, page <n>` of the skipped unit
    pub source: String,
    pub error: String,
}

/// Chunks produced by the pipeline plus the units it skipped
#[derive(Debug, Default)]
pub struct TransformOutput {
    pub chunks: Vec<Chunk>,
    pub failures: Vec<TransformFailure>,
}

/// Splits documents into chunks and annotates them with keywords
pub struct TransformationPipeline {
    splitter: SemanticSplitter,
    keywords: Option<KeywordExtractor>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl TransformationPipeline {
    pub fn new(
        splitter: SemanticSplitter,
        keywords: Option<KeywordExtractor>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            splitter,
            keywords,
            embedder,
        }
    }

    /// Run both stages over all documents
    pub async fn run(&self, documents: &[Document]) -> TransformOutput {
        let start = Instant::now();
        let mut output = TransformOutput::default();

        for doc in documents {
            self.split_document(doc, &mut output).await;
        }

        tracing::info!(
            "Split {} documents into {} chunks in {:.2}s",
            documents.len(),
            output.chunks.len(),
            start.elapsed().as_secs_f64()
        );

        if let Some(extractor) = &self.keywords {
            let start = Instant::now();
            for chunk in output.chunks.iter_mut() {
                match extractor.extract(chunk).await {
                    Ok(keywords) => {
                        tracing::debug!("{}: keywords {:?}", chunk.source.format_citation(), keywords);
                        chunk.set_keywords(keywords);
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            source = %chunk.source.format_citation(),
                            "Keyword extraction failed, keeping chunk without keywords"
                        );
                        output.failures.push(TransformFailure {
                            stage: Stage::Keywords,
                            source: chunk.source.format_citation(),
                            error: e.to_string(),
                        });
                    }
                }
            }
            tracing::info!(
                "Extracted keywords for {} chunks in {:.2}s",
                output.chunks.len(),
                start.elapsed().as_secs_f64()
            );
        }

        output
    }

    async fn split_document(&self, doc: &Document, output: &mut TransformOutput) {
        let mut next_index = 0u32;

        for page in &doc.pages {
            match self
                .splitter
                .split_page(doc, page, next_index, self.embedder.as_ref())
                .await
            {
                Ok(chunks) => {
                    next_index += chunks.len() as u32;
                    output.chunks.extend(chunks);
                }
                Err(e) => {
                    let source = match page.page_number {
                        Some(n) => format!("{}, page {}", doc.filename, n),
                        None => doc.filename.clone(),
                    };
                    tracing::warn!(error = %e, source = %source, "Splitting failed, skipping page");
                    output.failures.push(TransformFailure {
                        stage: Stage::Split,
                        source,
                        error: e.to_string(),
                    });
                }
            }
        }
    }
}
