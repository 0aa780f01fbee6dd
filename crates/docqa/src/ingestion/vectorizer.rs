//! End-to-end ingestion: load, transform, embed, index and persist

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::types::Document;

use super::keywords::KeywordExtractor;
use super::loader::DocumentLoader;
use super::pipeline::{TransformOutput, TransformationPipeline};
use super::splitter::SemanticSplitter;

/// Builds vector indexes from PDF/DOCX sources
pub struct Vectorizer {
    loader: DocumentLoader,
    pipeline: TransformationPipeline,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    show_progress: bool,
}

impl Vectorizer {
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        let keywords = config
            .keywords
            .enabled
            .then(|| KeywordExtractor::new(llm, config.keywords.count));

        Self {
            loader: DocumentLoader::new(),
            pipeline: TransformationPipeline::new(
                SemanticSplitter::from_config(&config.splitter),
                keywords,
                Arc::clone(&embedder),
            ),
            embedder,
            batch_size: config.embeddings.batch_size,
            show_progress: true,
        }
    }

    /// Enable or disable the embedding progress bar
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Load documents on the blocking thread pool
    pub async fn load_documents(
        &self,
        input_dir: Option<&Path>,
        input_files: Option<&[PathBuf]>,
    ) -> Result<Vec<Document>> {
        if input_dir.is_none() && input_files.is_none() {
            return Err(Error::invalid_input(
                "either an input directory or a list of input files is required",
            ));
        }

        let loader = self.loader.clone();
        let input_dir = input_dir.map(Path::to_path_buf);
        let input_files = input_files.map(<[PathBuf]>::to_vec);

        tokio::task::spawn_blocking(move || {
            loader.load(input_dir.as_deref(), input_files.as_deref())
        })
        .await
        .map_err(|e| Error::internal(format!("Document loading task failed: {}", e)))?
    }

    /// Split and annotate documents
    pub async fn transform(&self, documents: &[Document]) -> TransformOutput {
        self.pipeline.run(documents).await
    }

    /// Load, transform and index documents, persisting when `persist_dir` is given
    pub async fn build_vector_index(
        &self,
        input_dir: Option<&Path>,
        input_files: Option<&[PathBuf]>,
        persist_dir: Option<&Path>,
    ) -> Result<VectorIndex> {
        let start = Instant::now();

        let documents = self.load_documents(input_dir, input_files).await?;
        let output = self.transform(&documents).await;
        if !output.failures.is_empty() {
            tracing::warn!("{} units skipped during transformation", output.failures.len());
        }

        let index = VectorIndex::build(
            output.chunks,
            self.embedder.as_ref(),
            self.batch_size,
            self.show_progress,
        )
        .await?;

        if let Some(dir) = persist_dir {
            index.persist(dir)?;
        }

        tracing::info!(
            "Vectorized {} documents into {} chunks in {:.2}s",
            documents.len(),
            index.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(index)
    }
}
