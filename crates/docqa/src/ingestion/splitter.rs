//! Semantic splitting of document text into chunks
//!
//! Sentences are embedded together with `buffer_size` neighbours on each
//! side. A chunk boundary goes after every sentence whose window is farther
//! (cosine distance) from the next window than the configured percentile of
//! all adjacent distances in that page. Pages are split independently, so a
//! chunk never spans two pages.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::SplitterConfig;
use crate::error::{Error, Result};
use crate::index::similarity::{cosine_similarity, percentile};
use crate::providers::EmbeddingProvider;
use crate::types::{Chunk, ChunkSource, Document, PageContent};

/// Similarity-breakpoint text splitter
#[derive(Debug, Clone)]
pub struct SemanticSplitter {
    buffer_size: usize,
    breakpoint_percentile: f64,
}

impl Default for SemanticSplitter {
    fn default() -> Self {
        Self::from_config(&SplitterConfig::default())
    }
}

impl SemanticSplitter {
    pub fn new(buffer_size: usize, breakpoint_percentile: f64) -> Self {
        Self {
            buffer_size,
            breakpoint_percentile,
        }
    }

    pub fn from_config(config: &SplitterConfig) -> Self {
        Self::new(config.buffer_size, config.breakpoint_percentile)
    }

    /// Split every page of a document; fails on the first page that fails
    pub async fn split(
        &self,
        doc: &Document,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        for page in &doc.pages {
            let page_chunks = self
                .split_page(doc, page, chunks.len() as u32, embedder)
                .await?;
            chunks.extend(page_chunks);
        }
        Ok(chunks)
    }

    /// Split one page into chunks numbered from `start_index`
    pub async fn split_page(
        &self,
        doc: &Document,
        page: &PageContent,
        start_index: u32,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<Chunk>> {
        let pieces = self.split_text(&page.content, embedder).await?;

        let mut chunks = Vec::with_capacity(pieces.len());
        let mut offset = page.byte_offset;
        for (i, piece) in pieces.into_iter().enumerate() {
            let byte_start = offset;
            offset += piece.len();
            chunks.push(Chunk::new(
                doc.id,
                piece,
                ChunkSource::for_page(doc, page.page_number),
                byte_start,
                offset,
                start_index + i as u32,
            ));
        }

        Ok(chunks)
    }

    /// Split text into semantically coherent pieces
    ///
    /// Concatenating the pieces gives back the input exactly. Blank input
    /// yields no pieces.
    pub async fn split_text(
        &self,
        text: &str,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<String>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let sentences = split_sentences(text);
        if sentences.len() < 2 {
            return Ok(vec![text.to_string()]);
        }

        let windows = combine_sentences(&sentences, self.buffer_size);
        let embeddings = embedder.embed_batch(&windows).await?;
        if embeddings.len() != windows.len() {
            return Err(Error::embedding(format!(
                "expected {} embeddings, got {}",
                windows.len(),
                embeddings.len()
            )));
        }

        let distances: Vec<f64> = embeddings
            .windows(2)
            .map(|pair| 1.0 - cosine_similarity(&pair[0], &pair[1]) as f64)
            .collect();

        let threshold = match percentile(&distances, self.breakpoint_percentile) {
            Some(threshold) => threshold,
            None => return Ok(vec![text.to_string()]),
        };

        let mut pieces = Vec::new();
        let mut start = 0;
        for (i, distance) in distances.iter().enumerate() {
            if *distance > threshold {
                pieces.push(sentences[start..=i].concat());
                start = i + 1;
            }
        }
        pieces.push(sentences[start..].concat());

        tracing::debug!(
            "Split {} sentences into {} chunks (threshold {:.4})",
            sentences.len(),
            pieces.len(),
            threshold
        );

        Ok(pieces)
    }
}

/// Sentence spans covering the whole text; whitespace-only spans are merged
/// into a neighbour so that no chunk can be blank
fn split_sentences(text: &str) -> Vec<&str> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut pending_start: Option<usize> = None;

    for (start, sentence) in text.split_sentence_bound_indices() {
        let end = start + sentence.len();
        if sentence.trim().is_empty() {
            match spans.last_mut() {
                Some(last) => last.1 = end,
                None => {
                    pending_start.get_or_insert(start);
                }
            }
            continue;
        }
        spans.push((pending_start.take().unwrap_or(start), end));
    }

    spans.into_iter().map(|(start, end)| &text[start..end]).collect()
}

/// Each sentence joined with up to `buffer_size` neighbours on either side
fn combine_sentences(sentences: &[&str], buffer_size: usize) -> Vec<String> {
    (0..sentences.len())
        .map(|i| {
            let start = i.saturating_sub(buffer_size);
            let end = (i + buffer_size + 1).min(sentences.len());
            sentences[start..end].concat()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;

    use crate::types::FileType;

    /// Embeds texts by topic: "rust" vs anything else
    struct TopicEmbedder;

    #[async_trait]
    impl EmbeddingProvider for TopicEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let rust = text.matches("Rust").count() as f32;
            let cooking = text.matches("soup").count() as f32;
            Ok(vec![rust, cooking])
        }

        fn name(&self) -> &str {
            "topic"
        }

        fn model(&self) -> &str {
            "topic-v1"
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(Error::embedding("backend down"))
        }

        fn name(&self) -> &str {
            "failing"
        }

        fn model(&self) -> &str {
            "none"
        }
    }

    #[test]
    fn test_split_sentences_covers_text() {
        let text = "\n\nFirst one. Second one!\n\n  Third?  ";
        let sentences = split_sentences(text);

        assert_eq!(sentences.concat(), text);
        assert!(sentences.iter().all(|s| !s.trim().is_empty()));
        assert_eq!(sentences.len(), 3);
    }

    #[test]
    fn test_combine_sentences() {
        let windows = combine_sentences(&["a. ", "b. ", "c. "], 1);
        assert_eq!(windows, vec!["a. b. ", "a. b. c. ", "b. c. "]);
    }

    #[tokio::test]
    async fn test_topic_shift_creates_boundary() {
        let text = "Rust is fast. Rust is safe. Rust has cargo. Rust has traits. \
                    The soup is hot. The soup is salty. The soup needs bread.";
        let splitter = SemanticSplitter::new(0, 95.0);
        let pieces = splitter.split_text(text, &TopicEmbedder).await.unwrap();

        assert_eq!(pieces.concat(), text);
        assert_eq!(pieces.len(), 2);
        assert!(pieces[0].contains("traits") && !pieces[0].contains("soup"));
        assert!(pieces[1].starts_with("The soup is hot."));
    }

    #[tokio::test]
    async fn test_single_sentence_is_one_chunk() {
        let pieces = SemanticSplitter::default()
            .split_text("Only one sentence here.", &FailingEmbedder)
            .await
            .unwrap();
        assert_eq!(pieces, vec!["Only one sentence here."]);
    }

    #[tokio::test]
    async fn test_blank_text_yields_nothing() {
        let pieces = SemanticSplitter::default()
            .split_text("  \n ", &FailingEmbedder)
            .await
            .unwrap();
        assert!(pieces.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let result = SemanticSplitter::default()
            .split_text("One. Two. Three.", &FailingEmbedder)
            .await;
        assert!(matches!(result, Err(Error::Embedding(_))));
    }

    #[tokio::test]
    async fn test_chunks_keep_page_and_offsets() {
        let doc = Document::new(
            PathBuf::from("guide.pdf"),
            FileType::Pdf,
            vec![
                (Some(1), "Rust is fast. Rust is safe.\n".into()),
                (Some(2), "The soup is hot. The soup is salty.\n".into()),
            ],
            10,
        );

        let chunks = SemanticSplitter::default()
            .split(&doc, &TopicEmbedder)
            .await
            .unwrap();

        let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt, doc.text);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
            assert_eq!(&doc.text[chunk.byte_start..chunk.byte_end], chunk.content);
            let page = chunk.source.page_number.unwrap();
            assert_eq!(chunk.content.contains("soup"), page == 2);
        }
    }
}
