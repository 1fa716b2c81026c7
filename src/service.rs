//! # RAG service
//!
//! The application-facing surface: one explicitly constructed [`RagService`] owns the
//! vector store and the answer pipeline for the life of the process, and each front-end
//! command calls one of its operations.
//!
//! | Operation                    | Effect                                                   |
//! |------------------------------|----------------------------------------------------------|
//! | [`RagService::health`]       | status string + number of indexed chunks                 |
//! | [`RagService::ask`]          | answer a question from the configured `top_k` chunks     |
//! | [`RagService::upload`]       | store a pdf/txt/csv file, re-ingest the data folder      |
//! | [`RagService::reindex`]      | re-ingest the data folder on demand                      |
//!
//! Operations that change the store take `&mut self`, so a query can never observe a
//! half-finished rebuild.
//!
//! ## Uploads rebuild everything
//! An upload re-reads the whole data folder and appends the result to the store, exactly
//! as a manual [`reindex`](RagService::reindex) without `fresh` does. Chunks from files
//! that were already indexed are therefore indexed again. Use `reindex(true)` to start
//! over from the data folder alone.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::RagConfig;
use crate::embedding::{Embedder, EmbeddingPipeline};
use crate::llm::LanguageModel;
use crate::loader::{FileKind, load_all_documents};
use crate::search::RagSearch;
use crate::splitter::TextSplitter;
use crate::template::PromptTemplate;
use crate::vector_store::{BuildReport, QueryResult, VectorStore};

pub const HEALTH_STATUS: &str = "RAG API running";
pub const UNSUPPORTED_FILE_TYPE: &str = "Unsupported file type";
pub const INVALID_FILE_NAME: &str = "Invalid file name";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub indexed_chunks: usize,
}

/// Result of [`RagService::upload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UploadOutcome {
    Indexed { message: String, report: BuildReport },
    Rejected { error: String },
}

pub struct RagService {
    search: RagSearch,
    data_dir: PathBuf,
    top_k: usize,
}

impl RagService {
    pub fn new(search: RagSearch, data_dir: impl Into<PathBuf>, top_k: usize) -> Self {
        Self {
            search,
            data_dir: data_dir.into(),
            top_k,
        }
    }

    /// Wire the service from configuration and load the persisted store.
    pub fn start(
        config: &RagConfig,
        embedder: Box<dyn Embedder>,
        llm: Box<dyn LanguageModel>,
    ) -> Result<Self, Box<dyn Error>> {
        let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap)?;
        let template = match &config.prompt_template {
            Some(text) => PromptTemplate::new(text.clone())?,
            None => PromptTemplate::default(),
        };

        let mut store = VectorStore::new(&config.persist_dir, EmbeddingPipeline::new(embedder, splitter))?;
        store.load()?;

        info!(
            "Service started: {} indexed chunks, data folder {}",
            store.len(),
            config.data_dir.display()
        );
        Ok(Self::new(
            RagSearch::new(store, llm, template),
            &config.data_dir,
            config.top_k,
        ))
    }

    pub fn store(&self) -> &VectorStore {
        self.search.store()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: HEALTH_STATUS,
            indexed_chunks: self.store().len(),
        }
    }

    pub async fn ask(&self, question: &str) -> Result<String, Box<dyn Error>> {
        self.search.search_and_summarize(question, self.top_k).await
    }

    /// Raw retrieval, without the language model.
    pub fn search(&self, text: &str, top_k: usize) -> Result<Vec<QueryResult>, Box<dyn Error>> {
        self.store().query(text, top_k)
    }

    /// Store an uploaded file under the data folder and rebuild the index from it.
    ///
    /// Unsupported extensions are rejected before anything is written. Only the final
    /// component of `file_name` is used.
    pub fn upload(&mut self, file_name: &str, bytes: &[u8]) -> Result<UploadOutcome, Box<dyn Error>> {
        let Some(kind) = FileKind::from_file_name(file_name) else {
            warn!("Rejected upload {}: unsupported type", file_name);
            return Ok(UploadOutcome::Rejected {
                error: UNSUPPORTED_FILE_TYPE.to_string(),
            });
        };
        let Some(name) = Path::new(file_name).file_name().and_then(|n| n.to_str()) else {
            return Ok(UploadOutcome::Rejected {
                error: INVALID_FILE_NAME.to_string(),
            });
        };

        let folder = self.data_dir.join(kind.subfolder());
        fs::create_dir_all(&folder)?;
        let path = folder.join(name);
        fs::write(&path, bytes)?;
        info!("Saved upload to {}", path.display());

        let report = self.reindex(false)?;
        Ok(UploadOutcome::Indexed {
            message: format!("{name} uploaded and indexed"),
            report,
        })
    }

    /// Re-ingest the data folder. With `fresh`, the store is emptied first (including
    /// its files) so the corpus is rebuilt instead of appended.
    pub fn reindex(&mut self, fresh: bool) -> Result<BuildReport, Box<dyn Error>> {
        let store = self.search.store_mut();
        if fresh {
            store.clear()?;
        }
        let documents = load_all_documents(&self.data_dir)?;
        store.build_from_documents(&documents)
    }
}
