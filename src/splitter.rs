//! # Recursive character splitter
//!
//! Splits text into chunks of at most `chunk_size` characters with up to
//! `chunk_overlap` characters shared between consecutive chunks.
//!
//! The splitter tries separators from coarsest to finest:
//!
//! ```text
//! "\n\n"  paragraphs
//! "\n"    lines
//! " "     words
//! ""      single characters (last resort)
//! ```
//!
//! Pieces produced by a separator are greedily merged back together (joined with that
//! separator) until adding the next piece would exceed `chunk_size`. A piece that is
//! still too large on its own is split again with the next separator.
//!
//! Lengths are counted in `char`s, so multi-byte text is never cut inside a code point.
//!
//! ```rust
//! use rag_llm::splitter::TextSplitter;
//!
//! let splitter = TextSplitter::new(20, 5).unwrap();
//! let chunks = splitter.split_text("one two three four five six seven");
//! assert!(chunks.iter().all(|c| c.chars().count() <= 20));
//! ```

use std::collections::VecDeque;
use std::error::Error;

use tracing::debug;

use crate::document::{Chunk, Document, PageContent};

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Character-budgeted recursive splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Create a splitter.
    ///
    /// # Errors
    /// - `chunk_size` is zero.
    /// - `chunk_overlap` is larger than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, Box<dyn Error>> {
        if chunk_size == 0 {
            return Err("chunk_size must be greater than zero".into());
        }
        if chunk_overlap > chunk_size {
            return Err(format!(
                "chunk_overlap ({chunk_overlap}) is larger than chunk_size ({chunk_size})"
            )
            .into());
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split every document, copying the document's metadata onto each chunk.
    ///
    /// Binary documents are passed through as a single chunk.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            match &document.content {
                PageContent::Text(text) => {
                    chunks.extend(
                        self.split_text(text)
                            .into_iter()
                            .map(|piece| Chunk::new(piece, document.metadata.clone())),
                    );
                }
                PageContent::Binary(_) => {
                    chunks.push(Chunk {
                        content: document.content.clone(),
                        metadata: document.metadata.clone(),
                    });
                }
            }
        }
        debug!(
            "Split {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );
        chunks
    }

    /// Split a single text.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_with(text, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // First separator that occurs in the text; "" always matches.
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let finer = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, separator));
                fitting.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_with(piece, finer));
            }
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, separator));
        }
        chunks
    }

    /// Greedily join pieces up to `chunk_size`, carrying up to `chunk_overlap`
    /// characters of trailing pieces into the next chunk.
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joiner = if window.is_empty() { 0 } else { separator_len };
            if total + len + joiner > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window, separator);
                while total > self.chunk_overlap
                    || (total > 0
                        && total + len + if window.is_empty() { 0 } else { separator_len }
                            > self.chunk_size)
                {
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(front) + if window.is_empty() { 0 } else { separator_len };
                }
            }
            total += len + if window.is_empty() { 0 } else { separator_len };
            window.push_back(piece);
        }
        push_joined(&mut chunks, &window, separator);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
