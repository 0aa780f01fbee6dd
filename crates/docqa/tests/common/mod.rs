//! Deterministic stand-ins for the embedding and chat backends

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use docqa::providers::{EmbeddingProvider, LlmProvider};
use docqa::types::{ChatMessage, Chunk, ChunkSource, Document, FileType};
use docqa::{Result, VectorIndex};

pub const DIMENSIONS: usize = 64;

/// Hashes lowercase words into a fixed number of buckets
pub struct BagOfWordsEmbedder;

impl BagOfWordsEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            // FNV-1a
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in word.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            vector[(hash % DIMENSIONS as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vector(text))
    }

    fn name(&self) -> &str {
        "bag-of-words"
    }

    fn model(&self) -> &str {
        "bag-of-words-64"
    }
}

type Script = dyn Fn(&[ChatMessage]) -> Result<String> + Send + Sync;

/// Replies through a closure and records every conversation it sees
pub struct ScriptedLlm {
    script: Box<Script>,
    pub calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    pub fn new(script: impl Fn(&[ChatMessage]) -> Result<String> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Answers keyword prompts with fixed keywords and chat turns by citing
    /// the first retrieved source
    pub fn citing() -> Arc<Self> {
        Self::new(|messages| {
            let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
            if last.ends_with("Keywords: ") {
                return Ok("facts, places".to_string());
            }
            Ok(format!("Here is what the documents say.\n\n{}", first_source(messages)))
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.lock().push(messages.to_vec());
        (self.script)(messages)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-v1"
    }
}

/// The `<filename>, page <n>` header of the first context entry
pub fn first_source(messages: &[ChatMessage]) -> String {
    messages
        .first()
        .and_then(|system| {
            system
                .content
                .lines()
                .find_map(|line| line.strip_prefix("[1] "))
        })
        .unwrap_or("no source")
        .to_string()
}

/// Chunks of a single document with bag-of-words embeddings
pub fn embedded_chunks(filename: &str, pages: &[&str]) -> Vec<Chunk> {
    let doc = Document::new(
        Path::new(filename).to_path_buf(),
        FileType::Pdf,
        pages
            .iter()
            .enumerate()
            .map(|(i, text)| (Some(i as u32 + 1), text.to_string()))
            .collect(),
        0,
    );

    doc.pages
        .iter()
        .enumerate()
        .map(|(i, page)| {
            let mut chunk = Chunk::new(
                doc.id,
                page.content.clone(),
                ChunkSource::for_page(&doc, page.page_number),
                page.byte_offset,
                page.byte_offset + page.content.len(),
                i as u32,
            );
            chunk.embedding = BagOfWordsEmbedder::vector(&page.content);
            chunk
        })
        .collect()
}

pub fn embedded_index(filename: &str, pages: &[&str]) -> VectorIndex {
    VectorIndex::from_embedded(embedded_chunks(filename, pages), BagOfWordsEmbedder.model())
        .expect("valid index")
}

/// Write a PDF with one line of text per page
pub fn write_pdf(path: &Path, pages: &[&str]) {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("write pdf");
}
