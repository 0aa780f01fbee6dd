//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Metadata key under which extracted keywords are stored on a chunk
pub const KEYWORDS_METADATA_KEY: &str = "excerpt_keywords";

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Anything else
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a path's extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Text of a single page, positioned inside the document text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageContent {
    /// Page number (1-indexed); `None` when the format has no pages
    pub page_number: Option<u32>,
    /// Byte offset of this page in `Document::text`
    pub byte_offset: usize,
    /// Text content of the page
    pub content: String,
}

/// A loaded document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// File name without directories (used in citations)
    pub filename: String,
    /// Path the document was read from
    pub file_path: PathBuf,
    /// File type
    pub file_type: FileType,
    /// SHA-256 of the extracted text
    pub content_hash: String,
    /// Full text; the concatenation of all page contents
    pub text: String,
    /// Page-level content
    pub pages: Vec<PageContent>,
    /// Total number of pages (if applicable)
    pub total_pages: Option<u32>,
    /// File size in bytes
    pub file_size: u64,
    /// Load timestamp
    pub loaded_at: chrono::DateTime<chrono::Utc>,
    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Document {
    /// Build a document from `(page_number, text)` pairs in reading order
    pub fn new(
        file_path: PathBuf,
        file_type: FileType,
        pages: Vec<(Option<u32>, String)>,
        file_size: u64,
    ) -> Self {
        let filename = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.display().to_string());

        let mut text = String::new();
        let mut page_contents = Vec::with_capacity(pages.len());
        for (page_number, content) in pages {
            page_contents.push(PageContent {
                page_number,
                byte_offset: text.len(),
                content: content.clone(),
            });
            text.push_str(&content);
        }

        let total_pages = page_contents
            .iter()
            .filter_map(|p| p.page_number)
            .max();

        Self {
            id: Uuid::new_v4(),
            filename,
            file_path,
            file_type,
            content_hash: hash_content(&text),
            text,
            pages: page_contents,
            total_pages,
            file_size,
            loaded_at: chrono::Utc::now(),
            metadata: HashMap::new(),
        }
    }
}

/// Source information for a chunk (used for citations)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkSource {
    /// File name (used in citations)
    pub filename: String,
    /// Path the document was read from
    pub file_path: PathBuf,
    /// File type
    pub file_type: FileType,
    /// Page number (1-indexed, for PDF)
    pub page_number: Option<u32>,
    /// Total pages in document
    pub page_count: Option<u32>,
}

impl ChunkSource {
    /// Source info for a page of a document
    pub fn for_page(doc: &Document, page_number: Option<u32>) -> Self {
        Self {
            filename: doc.filename.clone(),
            file_path: doc.file_path.clone(),
            file_type: doc.file_type,
            page_number,
            page_count: doc.total_pages,
        }
    }

    /// Format source as `<filename>, page <n>`
    pub fn format_citation(&self) -> String {
        match self.page_number {
            Some(page) => format!("{}, page {}", self.filename, page),
            None => self.filename.clone(),
        }
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub content: String,
    /// Embedding vector
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Source information for citations
    pub source: ChunkSource,
    /// Byte range in the parent document text
    pub byte_start: usize,
    pub byte_end: usize,
    /// Chunk index within document
    pub chunk_index: u32,
    /// Keywords extracted by the language model
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        document_id: Uuid,
        content: String,
        source: ChunkSource,
        byte_start: usize,
        byte_end: usize,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content,
            embedding: Vec::new(),
            source,
            byte_start,
            byte_end,
            chunk_index,
            keywords: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Attach extracted keywords
    pub fn set_keywords(&mut self, keywords: Vec<String>) {
        self.metadata.insert(
            KEYWORDS_METADATA_KEY.to_string(),
            serde_json::json!(keywords.join(", ")),
        );
        self.keywords = keywords;
    }
}

/// SHA-256 hex digest of text content
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
