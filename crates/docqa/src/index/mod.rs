//! Flat in-memory vector index with JSON persistence
//!
//! Layout of a persisted index directory:
//! - `index_meta.json`: format version, embedding model, dimensions, chunk count
//! - `chunks.json`: every chunk with its embedding
//!
//! Both files are written through a temporary file and renamed into place, so
//! re-persisting to the same directory replaces the previous index.

pub mod similarity;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::Chunk;

pub use similarity::cosine_similarity;

/// Version of the on-disk layout
pub const INDEX_FORMAT_VERSION: u32 = 1;
/// Metadata file name inside an index directory
pub const META_FILE: &str = "index_meta.json";
/// Chunk file name inside an index directory
pub const CHUNKS_FILE: &str = "chunks.json";
/// Default number of results for a query
pub const DEFAULT_TOP_K: usize = 3;

/// Metadata stored next to the chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub format_version: u32,
    pub embedding_model: String,
    pub dimensions: usize,
    pub chunk_count: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A chunk with its similarity to a query
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Searchable set of embedded chunks
#[derive(Debug, Clone)]
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    embedding_model: String,
    dimensions: usize,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl VectorIndex {
    /// Embed all chunks and build an index over them
    pub async fn build(
        mut chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
        batch_size: usize,
        show_progress: bool,
    ) -> Result<Self> {
        let start = Instant::now();
        let batch_size = batch_size.max(1);

        let progress = if show_progress {
            let bar = ProgressBar::new(chunks.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar.set_message("Generating embeddings");
            bar
        } else {
            ProgressBar::hidden()
        };

        for batch in chunks.chunks_mut(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }
            for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }
            progress.inc(batch.len() as u64);
        }
        progress.finish_and_clear();

        let index = Self::from_embedded(chunks, embedder.model())?;

        tracing::info!(
            "Built index of {} chunks ({} dimensions) with {} in {:.2}s",
            index.len(),
            index.dimensions,
            index.embedding_model,
            start.elapsed().as_secs_f64()
        );

        Ok(index)
    }

    /// Build an index from chunks that already carry embeddings
    pub fn from_embedded(chunks: Vec<Chunk>, embedding_model: &str) -> Result<Self> {
        let dimensions = chunks.first().map(|c| c.embedding.len()).unwrap_or(0);

        if let Some(chunk) = chunks
            .iter()
            .find(|c| c.embedding.is_empty() || c.embedding.len() != dimensions)
        {
            return Err(Error::vector_index(format!(
                "chunk {} has {} dimensions, expected {}",
                chunk.id,
                chunk.embedding.len(),
                dimensions
            )));
        }

        Ok(Self {
            chunks,
            embedding_model: embedding_model.to_string(),
            dimensions,
            created_at: chrono::Utc::now(),
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Write the index to `dir`, replacing any index already there
    pub fn persist(&self, dir: &Path) -> Result<()> {
        let start = Instant::now();
        std::fs::create_dir_all(dir)?;

        let meta = IndexMeta {
            format_version: INDEX_FORMAT_VERSION,
            embedding_model: self.embedding_model.clone(),
            dimensions: self.dimensions,
            chunk_count: self.chunks.len(),
            created_at: self.created_at,
        };

        write_json_atomic(dir, CHUNKS_FILE, &self.chunks)?;
        write_json_atomic(dir, META_FILE, &meta)?;

        tracing::info!(
            "Persisted {} chunks to {} in {:.2}s",
            self.chunks.len(),
            dir.display(),
            start.elapsed().as_secs_f64()
        );

        Ok(())
    }

    /// Load an index written by [`VectorIndex::persist`]
    ///
    /// A missing directory or anything that is not a valid persisted index is
    /// a configuration error. The embedding model is not checked against the
    /// caller's provider; a differing name is only logged.
    pub fn load(dir: &Path) -> Result<Self> {
        let start = Instant::now();

        if !dir.is_dir() {
            return Err(Error::config(format!(
                "Vector index path does not exist: {}",
                dir.display()
            )));
        }

        let meta: IndexMeta = read_json(&dir.join(META_FILE))?;
        if meta.format_version != INDEX_FORMAT_VERSION {
            return Err(Error::config(format!(
                "Unsupported index format version {} in {}",
                meta.format_version,
                dir.display()
            )));
        }

        let chunks: Vec<Chunk> = read_json(&dir.join(CHUNKS_FILE))?;
        if chunks.len() != meta.chunk_count {
            return Err(Error::config(format!(
                "Index at {} is incomplete: {} chunks, metadata says {}",
                dir.display(),
                chunks.len(),
                meta.chunk_count
            )));
        }

        let mut index = Self::from_embedded(chunks, &meta.embedding_model)
            .map_err(|e| Error::config(format!("Invalid index at {}: {}", dir.display(), e)))?;
        index.created_at = meta.created_at;

        tracing::info!(
            "Loaded {} chunks from {} in {:.2}s",
            index.len(),
            dir.display(),
            start.elapsed().as_secs_f64()
        );

        Ok(index)
    }

    /// Embed `text` and return the `top_k` most similar chunks
    pub async fn query(
        &self,
        text: &str,
        top_k: usize,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 {
            return Err(Error::invalid_input("top_k must be a positive integer"));
        }
        if embedder.model() != self.embedding_model {
            tracing::warn!(
                "Querying index built with '{}' using '{}'",
                self.embedding_model,
                embedder.model()
            );
        }

        let embedding = embedder.embed(text).await?;
        self.search(&embedding, top_k)
    }

    /// Return the `top_k` chunks most similar to `embedding`, best first
    ///
    /// Ties keep index order, so identical indexes rank identically.
    pub fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 {
            return Err(Error::invalid_input("top_k must be a positive integer"));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if embedding.len() != self.dimensions {
            return Err(Error::vector_index(format!(
                "query has {} dimensions, index has {}",
                embedding.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let score = cosine_similarity(embedding, &chunk.embedding);
                (i, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.chunks[i].clone(),
                score,
            })
            .collect())
    }

    /// Incremental updates are not supported; rebuild the index instead
    pub fn merge(&mut self, chunks: Vec<Chunk>) -> Result<()> {
        Err(Error::Unsupported(format!(
            "merging {} new chunks into an existing index; rebuild the index instead",
            chunks.len()
        )))
    }
}

fn write_json_atomic<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<()> {
    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
    }
    tmp.persist(dir.join(name)).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = std::fs::File::open(path).map_err(|e| {
        Error::config(format!("Not a valid vector index ({}): {}", path.display(), e))
    })?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::config(format!("Corrupt index file {}: {}", path.display(), e)))
}
