//! # Embedding pipeline
//!
//! Turns documents into chunks and chunks into fixed-width vectors.
//!
//! - [`Embedder`] is the seam for the embedding model. The production implementation,
//!   [`SentenceEmbeddingsModel`], runs a BERT sentence transformer
//!   (`sentence-transformers/all-MiniLM-L6-v2` by default, 384 dims) through Candle.
//! - [`EmbeddingPipeline`] pairs an embedder with a [`TextSplitter`] and exposes the two
//!   pipeline steps, [`chunk_documents`](EmbeddingPipeline::chunk_documents) and
//!   [`embed_chunks`](EmbeddingPipeline::embed_chunks).
//!
//! ## Skipping malformed chunks
//! `embed_chunks` never aborts a batch because of one bad chunk. Chunks that are binary,
//! blank after trimming, or carry NUL / U+FFFD characters are skipped. Each skip is logged
//! and reported in [`EmbeddedChunks::skipped`], and [`EmbeddedChunks::kept`] records which
//! input chunk produced each vector. Errors raised by the model itself propagate.

use std::error::Error;
use std::fmt;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use indicatif::{ProgressBar, ProgressStyle};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, error, info, warn};

use crate::document::{Chunk, Document, PageContent};
use crate::splitter::TextSplitter;

/// Default Hugging Face model id for sentence embeddings.
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Anything that maps text to a fixed-width vector.
pub trait Embedder {
    /// Encode one text into a vector. Every call on the same embedder returns vectors of
    /// the same length.
    fn encode(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error>>;
}

/// Sentence embeddings model using Candle (pure Rust).
pub struct SentenceEmbeddingsModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    hidden_size: usize,
}

impl SentenceEmbeddingsModel {
    /// Load `model_id` from the Hugging Face Hub (cached locally after the first download).
    ///
    /// # Errors
    /// Network, cache, tokenizer, or weight-loading failures.
    pub fn load(model_id: &str) -> Result<Self, Box<dyn Error>> {
        let device = Device::Cpu;
        let repo = Repo::with_revision(model_id.to_string(), RepoType::Model, "main".to_string());
        let api = Api::new()?;
        let api_repo = api.repo(repo);

        let config_filename = api_repo.get("config.json")?;
        let tokenizer_filename = api_repo.get("tokenizer.json")?;
        let weights_filename = api_repo.get("model.safetensors")?;

        let config = std::fs::read_to_string(config_filename)?;
        let config: Config = serde_json::from_str(&config)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| format!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_position_embeddings,
                ..Default::default()
            }))
            .map_err(|e| format!("Failed to configure truncation: {}", e))?;

        // SAFETY: the safetensors file lives in the hub cache and is not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_filename], DTYPE, &device)? };
        let model = BertModel::load(vb, &config)?;

        info!("Loaded embedding model: {}", model_id);

        Ok(Self {
            model,
            tokenizer,
            device,
            hidden_size: config.hidden_size,
        })
    }

    /// Width of the vectors this model produces.
    pub fn dimension(&self) -> usize {
        self.hidden_size
    }

    /// Mean pooling over token embeddings, considering attention mask
    fn mean_pooling(&self, embeddings: &Tensor, attention_mask: &[u32]) -> Result<Tensor, Box<dyn Error>> {
        // embeddings: [1, seq_len, hidden]; mask reshaped to [1, seq_len, 1]
        let mask = Tensor::new(attention_mask, &self.device)?
            .to_dtype(DType::F32)?
            .unsqueeze(0)?
            .unsqueeze(2)?;

        let sum = embeddings.broadcast_mul(&mask)?.sum(1)?;
        let count = mask.sum(1)?.clamp(1f32, f32::INFINITY)?;
        let mean = sum.broadcast_div(&count)?.squeeze(0)?;
        Ok(mean)
    }

    fn normalize(&self, tensor: &Tensor) -> Result<Tensor, Box<dyn Error>> {
        let norm = tensor.sqr()?.sum_all()?.sqrt()?;
        Ok(tensor.broadcast_div(&norm)?)
    }
}

impl Embedder for SentenceEmbeddingsModel {
    fn encode(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error>> {
        let tokens = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| format!("Tokenization error: {}", e))?;

        let token_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(tokens.get_type_ids(), &self.device)?.unsqueeze(0)?;

        let output = self.model.forward(&token_ids, &token_type_ids, None)?;
        let pooled = self.mean_pooling(&output, tokens.get_attention_mask())?;
        let normalized = self.normalize(&pooled)?;

        Ok(normalized.to_vec1::<f32>()?)
    }
}

/// Why a chunk produced no vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The chunk holds binary content rather than text.
    NotText,
    /// The chunk is empty or whitespace-only.
    Empty,
    /// The chunk text carries NUL bytes or U+FFFD replacement characters.
    InvalidEncoding,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotText => f.write_str("not text"),
            SkipReason::Empty => f.write_str("empty"),
            SkipReason::InvalidEncoding => f.write_str("invalid encoding"),
        }
    }
}

/// A chunk that was left out of an embedding batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedChunk {
    /// Position of the chunk in the input slice.
    pub index: usize,
    pub reason: SkipReason,
}

/// Output of [`EmbeddingPipeline::embed_chunks`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedChunks {
    /// One vector per surviving chunk, in input order.
    pub vectors: Vec<Vec<f32>>,
    /// `kept[i]` is the input index of the chunk behind `vectors[i]`.
    pub kept: Vec<usize>,
    pub skipped: Vec<SkippedChunk>,
}

impl EmbeddedChunks {
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Check a chunk and return the text to embed.
fn embeddable_text(chunk: &Chunk) -> Result<&str, SkipReason> {
    let text = match &chunk.content {
        PageContent::Text(text) => text.trim(),
        PageContent::Binary(_) => return Err(SkipReason::NotText),
    };
    if text.is_empty() {
        return Err(SkipReason::Empty);
    }
    if text.contains(['\0', char::REPLACEMENT_CHARACTER]) {
        return Err(SkipReason::InvalidEncoding);
    }
    Ok(text)
}

/// Splitter + embedder.
pub struct EmbeddingPipeline {
    embedder: Box<dyn Embedder>,
    splitter: TextSplitter,
}

impl EmbeddingPipeline {
    pub fn new(embedder: Box<dyn Embedder>, splitter: TextSplitter) -> Self {
        Self { embedder, splitter }
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Split documents into overlapping chunks.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let chunks = self.splitter.split_documents(documents);
        info!(
            "Split {} documents into {} chunks.",
            documents.len(),
            chunks.len()
        );
        chunks
    }

    /// Embed every valid chunk.
    ///
    /// # Errors
    /// Propagates the first error raised by the embedder.
    pub fn embed_chunks(&self, chunks: &[Chunk]) -> Result<EmbeddedChunks, Box<dyn Error>> {
        let mut texts = Vec::with_capacity(chunks.len());
        let mut out = EmbeddedChunks::default();

        for (index, chunk) in chunks.iter().enumerate() {
            match embeddable_text(chunk) {
                Ok(text) => {
                    texts.push(text);
                    out.kept.push(index);
                }
                Err(reason) => {
                    warn!("Skipping chunk at index {} ({})", index, reason);
                    out.skipped.push(SkippedChunk { index, reason });
                }
            }
        }

        info!(
            "Valid chunks: {}, Skipped: {}",
            texts.len(),
            out.skipped.len()
        );

        if texts.is_empty() {
            error!("No valid text chunks to embed.");
            return Ok(out);
        }

        let progress = ProgressBar::new(texts.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}") {
            progress.set_style(style);
        }
        progress.set_message("Embedding");

        out.vectors.reserve(texts.len());
        for text in texts {
            match self.embedder.encode(text) {
                Ok(vector) => out.vectors.push(vector),
                Err(e) => {
                    progress.abandon();
                    error!("Encoding failed: {}", e);
                    return Err(e);
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        debug!(
            "Embeddings shape: ({}, {})",
            out.vectors.len(),
            out.vectors.first().map_or(0, Vec::len)
        );
        Ok(out)
    }
}
