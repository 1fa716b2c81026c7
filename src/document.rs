//! # Documents, chunks and metadata records
//!
//! The small set of value types that flow through the ingestion pipeline:
//!
//! ```text
//! files ──loader──▶ Document ──splitter──▶ Chunk ──embed──▶ (vector, ChunkMetadata)
//! ```
//!
//! A [`Document`] is what a loader produces from a file (or a page/row of a file).
//! A [`Chunk`] is a bounded slice of a document's text. Only [`ChunkMetadata`] is
//! persisted; documents and chunks live for the duration of a build.

use serde::{Deserialize, Serialize};

/// The body of a document or chunk.
///
/// Loaders produce [`PageContent::Binary`] when a file's bytes are not valid UTF-8.
/// Binary content is never split and never embedded; it is carried through so the
/// embedding step can report it as skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContent {
    Text(String),
    Binary(Vec<u8>),
}

impl PageContent {
    /// The text, if this is textual content.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PageContent::Text(text) => Some(text),
            PageContent::Binary(_) => None,
        }
    }
}

impl From<&str> for PageContent {
    fn from(value: &str) -> Self {
        PageContent::Text(value.to_string())
    }
}

impl From<String> for PageContent {
    fn from(value: String) -> Self {
        PageContent::Text(value)
    }
}

/// Where a document came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Path of the originating file.
    pub source: String,
    /// 1-based page number for paginated sources (PDF).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// 0-based data row for tabular sources (CSV).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u64>,
}

impl SourceMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page: None,
            row: None,
        }
    }
}

/// Raw text plus source metadata, as read by a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: PageContent,
    pub metadata: SourceMetadata,
}

impl Document {
    /// Build a text document.
    ///
    /// # Examples
    /// ```rust
    /// use rag_llm::document::Document;
    ///
    /// let doc = Document::new("The sky is blue.", "notes.txt");
    /// assert_eq!(doc.content.as_text(), Some("The sky is blue."));
    /// assert_eq!(doc.metadata.source, "notes.txt");
    /// ```
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: PageContent::Text(text.into()),
            metadata: SourceMetadata::new(source),
        }
    }
}

/// A contiguous piece of a document's text; the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: PageContent,
    pub metadata: SourceMetadata,
}

impl Chunk {
    pub fn new(content: impl Into<PageContent>, metadata: SourceMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// The persisted record stored at the same ordinal position as its vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// The chunk's original text.
    pub text: String,
}

impl ChunkMetadata {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
