//! # VectorStore
//!
//! The searchable corpus: an exact nearest-neighbour index (`hora`'s brute-force index,
//! Euclidean metric) plus a metadata list that is positionally aligned with it.
//!
//! ## Alignment
//! Vector ids are ordinal positions. The vector added `i`-th gets id `i` and its
//! [`ChunkMetadata`] lives at `metadata[i]`. Growth is append-only, so the two never
//! drift apart; every mutation validates the whole batch before touching either side.
//!
//! ## Lifecycle
//! ```text
//! UNINITIALIZED ──add_embeddings──▶ POPULATED ──save──▶ POPULATED
//!        ▲                              │
//!        └──────── load (no index) ─────┘   load (index present) ──▶ POPULATED
//! ```
//! The index is created lazily by the first non-empty [`VectorStore::add_embeddings`]
//! call and sized to that batch's vector width.
//!
//! ## Persistence layout
//! Two files inside the store directory, both replaced on [`VectorStore::save`]
//! (written as `.tmp` siblings, then renamed):
//! - `index.bin`: the `hora` index dump.
//! - `metadata.yaml`: the vector `dimension`, the vector `count` and the ordered
//!   `records` (`{text}`).
//!
//! [`VectorStore::load`] refuses a pair whose count or width disagree.
//!
//! ## Quick Example
//! ```no_run
//! use rag_llm::document::Document;
//! use rag_llm::embedding::{DEFAULT_EMBEDDING_MODEL, EmbeddingPipeline, SentenceEmbeddingsModel};
//! use rag_llm::splitter::TextSplitter;
//! use rag_llm::vector_store::VectorStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = SentenceEmbeddingsModel::load(DEFAULT_EMBEDDING_MODEL)?;
//! let pipeline = EmbeddingPipeline::new(Box::new(model), TextSplitter::new(1000, 200)?);
//! let mut store = VectorStore::new("vector_store", pipeline)?;
//! store.build_from_documents(&[Document::new("Rust is great!", "notes.txt")])?;
//! for hit in store.query("I love Rust!", 3)? {
//!     println!("{:.3} {}", hit.score, hit.metadata.text);
//! }
//! # Ok(()) }
//! ```

use std::error::Error;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use hora::core::ann_index::{ANNIndex, SerializableIndex};
use hora::core::metrics::Metric;
use hora::index::bruteforce_idx::BruteForceIndex;
use hora::index::bruteforce_params::BruteForceParams;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::document::{ChunkMetadata, Document};
use crate::embedding::EmbeddingPipeline;

pub const INDEX_FILE: &str = "index.bin";
pub const METADATA_FILE: &str = "metadata.yaml";

/// Vector store failures.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("vector store has no index; add embeddings or load a saved store first")]
    Uninitialized,
    #[error("dimension mismatch: index holds {expected}-d vectors, got {found}-d")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("vector contains NaN or infinite components")]
    NonFiniteVector,
    #[error("metadata mismatch: {vectors} vectors but {metadata} metadata records")]
    MetadataMismatch { vectors: usize, metadata: usize },
    #[error("index file {0} exists but its metadata file is missing")]
    MissingMetadata(PathBuf),
    #[error("index error: {0}")]
    Index(&'static str),
}

/// One nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Distance to the query vector; lower is more similar.
    pub score: f32,
    pub metadata: ChunkMetadata,
}

/// Counts from [`VectorStore::build_from_documents`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub documents: usize,
    pub chunks: usize,
    pub indexed: usize,
    pub skipped: usize,
}

#[derive(Serialize, Deserialize)]
struct PersistedMetadata {
    dimension: usize,
    count: usize,
    records: Vec<ChunkMetadata>,
}

/// Run a `hora` call, turning its internal panics (it unwraps I/O and decode errors)
/// into [`VectorStoreError::Index`].
fn guarded<T>(
    what: &'static str,
    call: impl FnOnce() -> Result<T, &'static str>,
) -> Result<T, VectorStoreError> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or(Err(what))
        .map_err(VectorStoreError::Index)
}

fn check_finite(vector: &[f32]) -> Result<(), VectorStoreError> {
    if vector.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(VectorStoreError::NonFiniteVector)
    }
}

/// Persistent, queryable embedding store.
pub struct VectorStore {
    persist_dir: PathBuf,
    index: Option<BruteForceIndex<f32, usize>>,
    dimension: usize,
    metadata: Vec<ChunkMetadata>,
    pipeline: EmbeddingPipeline,
}

impl VectorStore {
    /// Create an empty store persisting into `persist_dir` (created if missing).
    pub fn new(
        persist_dir: impl Into<PathBuf>,
        pipeline: EmbeddingPipeline,
    ) -> Result<Self, Box<dyn Error>> {
        let persist_dir = persist_dir.into();
        fs::create_dir_all(&persist_dir)?;
        Ok(Self {
            persist_dir,
            index: None,
            dimension: 0,
            metadata: Vec::new(),
            pipeline,
        })
    }

    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    /// Whether an index exists (the store is POPULATED).
    pub fn is_initialized(&self) -> bool {
        self.index.is_some()
    }

    /// Number of stored vectors (equal to the number of metadata records).
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Vector width of the index, `None` while uninitialized.
    pub fn dimension(&self) -> Option<usize> {
        self.index.as_ref().map(|_| self.dimension)
    }

    pub fn metadata(&self) -> &[ChunkMetadata] {
        &self.metadata
    }

    /// Chunk, embed, append and persist `documents`.
    ///
    /// Only chunks that produced a vector contribute metadata. The new vectors are
    /// appended to whatever the store already holds.
    pub fn build_from_documents(&mut self, documents: &[Document]) -> Result<BuildReport, Box<dyn Error>> {
        info!("Building vector store from {} documents...", documents.len());

        let chunks = self.pipeline.chunk_documents(documents);
        let embedded = self.pipeline.embed_chunks(&chunks)?;

        let metadata: Vec<ChunkMetadata> = embedded
            .kept
            .iter()
            .map(|&i| ChunkMetadata::new(chunks[i].content.as_text().unwrap_or_default()))
            .collect();

        let report = BuildReport {
            documents: documents.len(),
            chunks: chunks.len(),
            indexed: embedded.len(),
            skipped: embedded.skipped.len(),
        };

        self.add_embeddings(embedded.vectors, Some(metadata))?;

        if self.is_initialized() {
            self.save()?;
            info!(
                "Vector store built: {} new vectors, {} total",
                report.indexed,
                self.len()
            );
        } else {
            warn!("Nothing to index; vector store left empty and not persisted");
        }

        Ok(report)
    }

    /// Append vectors (and their metadata) to the index.
    ///
    /// # Errors
    /// - [`VectorStoreError::DimensionMismatch`] if any vector's width differs from the
    ///   index (or, for the first batch, from the batch's first vector).
    /// - [`VectorStoreError::NonFiniteVector`] if any component is NaN or infinite.
    /// - [`VectorStoreError::MetadataMismatch`] if `metadata` is given with a different
    ///   length than `vectors`.
    ///
    /// Nothing is modified when an error is returned. Without `metadata`, empty records
    /// are appended so the store stays aligned.
    pub fn add_embeddings(
        &mut self,
        vectors: Vec<Vec<f32>>,
        metadata: Option<Vec<ChunkMetadata>>,
    ) -> Result<(), VectorStoreError> {
        if let Some(metadata) = &metadata {
            if metadata.len() != vectors.len() {
                return Err(VectorStoreError::MetadataMismatch {
                    vectors: vectors.len(),
                    metadata: metadata.len(),
                });
            }
        }
        let Some(first) = vectors.first() else {
            debug!("add_embeddings called with an empty batch");
            return Ok(());
        };

        let dimension = if self.index.is_some() {
            self.dimension
        } else {
            first.len()
        };
        for vector in &vectors {
            if vector.len() != dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: dimension,
                    found: vector.len(),
                });
            }
            check_finite(vector)?;
        }

        let index = self.index.get_or_insert_with(|| {
            info!("Creating {}-d index", dimension);
            BruteForceIndex::new(dimension, &BruteForceParams::default())
        });
        self.dimension = dimension;

        let start = self.metadata.len();
        for (offset, vector) in vectors.iter().enumerate() {
            index
                .add(vector, start + offset)
                .map_err(VectorStoreError::Index)?;
        }
        index.build(Metric::Euclidean).map_err(VectorStoreError::Index)?;

        let added = vectors.len();
        match metadata {
            Some(records) => self.metadata.extend(records),
            None => self
                .metadata
                .extend(std::iter::repeat_with(ChunkMetadata::default).take(added)),
        }

        debug!("Added {} vectors; store now holds {}", added, self.metadata.len());
        Ok(())
    }

    /// Write the index and metadata, overwriting previous files.
    ///
    /// Both artifacts are written to `.tmp` siblings first and renamed into place only
    /// once both writes succeeded.
    pub fn save(&mut self) -> Result<(), Box<dyn Error>> {
        let index = self.index.as_mut().ok_or(VectorStoreError::Uninitialized)?;

        let index_tmp = self.persist_dir.join(format!("{INDEX_FILE}.tmp"));
        let index_tmp_str = index_tmp
            .to_str()
            .ok_or_else(|| format!("non UTF-8 path: {}", index_tmp.display()))?;
        guarded("failed to write index file", || index.dump(index_tmp_str))?;

        let persisted = PersistedMetadata {
            dimension: self.dimension,
            count: self.metadata.len(),
            records: self.metadata.clone(),
        };
        let metadata_tmp = self.persist_dir.join(format!("{METADATA_FILE}.tmp"));
        fs::write(&metadata_tmp, serde_yaml::to_string(&persisted)?)?;

        fs::rename(&index_tmp, self.persist_dir.join(INDEX_FILE))?;
        fs::rename(&metadata_tmp, self.persist_dir.join(METADATA_FILE))?;

        info!(
            "Saved vector store ({} vectors) to {}",
            self.metadata.len(),
            self.persist_dir.display()
        );
        Ok(())
    }

    /// Restore index and metadata from disk.
    ///
    /// A missing index file is the normal first-run condition: the store is reset to
    /// empty and `Ok(())` is returned.
    ///
    /// # Errors
    /// - [`VectorStoreError::MissingMetadata`] if only the index file exists.
    /// - [`VectorStoreError::Index`] if the index file is empty or cannot be decoded.
    /// - [`VectorStoreError::MetadataMismatch`] / [`VectorStoreError::DimensionMismatch`]
    ///   if the two files disagree on vector count or width.
    ///
    /// The in-memory store is only replaced once both files have been validated.
    pub fn load(&mut self) -> Result<(), Box<dyn Error>> {
        let index_path = self.persist_dir.join(INDEX_FILE);
        let metadata_path = self.persist_dir.join(METADATA_FILE);

        if !index_path.exists() {
            info!("No index found in {}. Starting empty.", self.persist_dir.display());
            self.reset();
            return Ok(());
        }
        if !metadata_path.exists() {
            return Err(VectorStoreError::MissingMetadata(index_path).into());
        }

        let index_path_str = index_path
            .to_str()
            .ok_or_else(|| format!("non UTF-8 path: {}", index_path.display()))?;
        if fs::metadata(&index_path)?.len() == 0 {
            return Err(VectorStoreError::Index("index file is empty").into());
        }
        let mut index = guarded("index file is corrupt", || {
            BruteForceIndex::<f32, usize>::load(index_path_str)
        })?;
        guarded("index file is corrupt", || index.build(Metric::Euclidean))?;

        let persisted: PersistedMetadata =
            serde_yaml::from_str(&fs::read_to_string(&metadata_path)?)?;
        let records = persisted.records.len();
        if persisted.count != records {
            return Err(VectorStoreError::MetadataMismatch {
                vectors: persisted.count,
                metadata: records,
            }
            .into());
        }
        if index.dimension() != persisted.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: persisted.dimension,
                found: index.dimension(),
            }
            .into());
        }
        // k past the record count returns every stored vector
        let origin = vec![0f32; persisted.dimension];
        let stored = guarded("index file is corrupt", || {
            Ok(index.search_nodes(&origin, records + 1).len())
        })?;
        if stored != records {
            return Err(VectorStoreError::MetadataMismatch {
                vectors: stored,
                metadata: records,
            }
            .into());
        }

        self.index = Some(index);
        self.dimension = persisted.dimension;
        self.metadata = persisted.records;

        info!("Index loaded: {} vectors", self.metadata.len());
        Ok(())
    }

    /// Drop the in-memory index and metadata (back to UNINITIALIZED). Files are untouched.
    pub fn reset(&mut self) {
        self.index = None;
        self.dimension = 0;
        self.metadata.clear();
    }

    /// [`reset`](Self::reset) and delete the persisted files.
    pub fn clear(&mut self) -> Result<(), Box<dyn Error>> {
        self.reset();
        for name in [INDEX_FILE, METADATA_FILE] {
            let path = self.persist_dir.join(name);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Embed `text` and return up to `top_k` nearest chunks, closest first.
    pub fn query(&self, text: &str, top_k: usize) -> Result<Vec<QueryResult>, Box<dyn Error>> {
        if self.index.is_none() || top_k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.pipeline.embedder().encode(text)?;
        Ok(self.search_vector(&vector, top_k)?)
    }

    /// Nearest-neighbour search for an already-embedded query.
    pub fn search_vector(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryResult>, VectorStoreError> {
        let Some(index) = &self.index else {
            return Ok(Vec::new());
        };
        if vector.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                found: vector.len(),
            });
        }
        check_finite(vector)?;

        let k = top_k.min(self.metadata.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut results: Vec<QueryResult> = index
            .search_nodes(vector, k)
            .into_iter()
            .filter_map(|(node, distance)| {
                let id = (*node.idx())?;
                self.metadata.get(id).map(|record| QueryResult {
                    score: distance,
                    metadata: record.clone(),
                })
            })
            .collect();
        results.sort_by(|a, b| a.score.total_cmp(&b.score));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{PageContent, SourceMetadata};
    use crate::splitter::TextSplitter;
    use crate::testing::KeywordEmbedder;
    use tempfile::tempdir;

    fn store_in(dir: &Path, chunk_size: usize) -> VectorStore {
        let pipeline = EmbeddingPipeline::new(
            Box::new(KeywordEmbedder::default()),
            TextSplitter::new(chunk_size, 0).unwrap(),
        );
        VectorStore::new(dir, pipeline).unwrap()
    }

    fn records(texts: &[&str]) -> Vec<ChunkMetadata> {
        texts.iter().map(|t| ChunkMetadata::new(*t)).collect()
    }

    #[test]
    fn test_uninitialized_store() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), 1000);

        assert!(!store.is_initialized());
        assert_eq!(store.dimension(), None);
        assert!(store.query("anything", 3).unwrap().is_empty());
        assert!(store.save().is_err());
    }

    #[test]
    fn test_add_embeddings_keeps_alignment() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), 1000);

        store
            .add_embeddings(vec![vec![0.0, 0.0], vec![1.0, 0.0]], Some(records(&["a", "b"])))
            .unwrap();
        store.add_embeddings(vec![vec![2.0, 0.0]], None).unwrap();
        store
            .add_embeddings(vec![vec![3.0, 0.0]], Some(records(&["d"])))
            .unwrap();

        assert_eq!(store.len(), 4);
        assert_eq!(store.dimension(), Some(2));
        assert_eq!(store.metadata()[2], ChunkMetadata::default());
        assert_eq!(store.search_vector(&[0.0, 0.0], 10).unwrap().len(), 4);
    }

    #[test]
    fn test_add_embeddings_empty_batch_is_noop() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), 1000);
        store.add_embeddings(Vec::new(), Some(Vec::new())).unwrap();
        assert!(!store.is_initialized());
    }

    #[test]
    fn test_dimension_mismatch_fails_fast() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), 1000);

        let err = store
            .add_embeddings(vec![vec![0.0, 0.0], vec![1.0]], None)
            .unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch { expected: 2, found: 1 }
        ));
        assert!(!store.is_initialized());

        store.add_embeddings(vec![vec![0.0, 0.0]], None).unwrap();
        let err = store
            .add_embeddings(vec![vec![0.0, 0.0, 0.0]], None)
            .unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch { expected: 2, found: 3 }
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_metadata_length_mismatch_rejected() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), 1000);
        let err = store
            .add_embeddings(vec![vec![0.0], vec![1.0]], Some(records(&["only one"])))
            .unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::MetadataMismatch { vectors: 2, metadata: 1 }
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_top_k_larger_than_store_returns_all_sorted() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), 1000);
        store
            .add_embeddings(
                vec![vec![5.0, 0.0], vec![1.0, 0.0], vec![3.0, 0.0]],
                Some(records(&["far", "near", "middle"])),
            )
            .unwrap();

        let hits = store.search_vector(&[0.0, 0.0], 10).unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.metadata.text.as_str()).collect();
        assert_eq!(texts, vec!["near", "middle", "far"]);
        assert!(hits.windows(2).all(|w| w[0].score <= w[1].score));

        assert!(store.search_vector(&[0.0, 0.0], 0).unwrap().is_empty());
        assert!(store.search_vector(&[0.0], 1).is_err());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), 1000);
        store
            .build_from_documents(&[
                Document::new("The sky is blue.", "a.txt"),
                Document::new("Grass is green.", "b.txt"),
                Document::new("Rust is fast.", "c.txt"),
            ])
            .unwrap();
        assert!(dir.path().join(INDEX_FILE).exists());
        assert!(dir.path().join(METADATA_FILE).exists());

        let mut reloaded = store_in(dir.path(), 1000);
        reloaded.load().unwrap();

        assert_eq!(reloaded.len(), store.len());
        assert_eq!(reloaded.metadata(), store.metadata());
        assert_eq!(reloaded.dimension(), store.dimension());
        let hits = reloaded.query("green grass", 1).unwrap();
        assert_eq!(hits, store.query("green grass", 1).unwrap());
        assert_eq!(hits[0].metadata.text, "Grass is green.");
    }

    #[test]
    fn test_load_without_files_resets_to_empty() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), 1000);
        store.add_embeddings(vec![vec![1.0]], None).unwrap();

        store.load().unwrap();

        assert!(!store.is_initialized());
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_with_missing_metadata_fails() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), 1000);
        store.add_embeddings(vec![vec![1.0, 0.0]], None).unwrap();
        store.save().unwrap();
        fs::remove_file(dir.path().join(METADATA_FILE)).unwrap();

        assert!(store_in(dir.path(), 1000).load().is_err());
    }

    #[test]
    fn test_sky_is_blue_end_to_end() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), 1000);
        store
            .build_from_documents(&[
                Document::new("The sky is blue.", "sky.txt"),
                Document::new("Grass is green.", "grass.txt"),
            ])
            .unwrap();

        let hits = store.query("What color is the sky?", 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.text, "The sky is blue.");
    }

    #[test]
    fn test_build_skips_bad_chunks_without_misalignment() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), 1000);
        let report = store
            .build_from_documents(&[
                Document {
                    content: PageContent::Binary(vec![0xc3, 0x28]),
                    metadata: SourceMetadata::new("broken.txt"),
                },
                Document::new("Grass is green.", "grass.txt"),
            ])
            .unwrap();

        assert_eq!(
            report,
            BuildReport { documents: 2, chunks: 2, indexed: 1, skipped: 1 }
        );
        assert_eq!(store.metadata(), records(&["Grass is green."]).as_slice());
    }

    #[test]
    fn test_build_with_nothing_valid_persists_nothing() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), 1000);
        let report = store
            .build_from_documents(&[Document::new("   ", "blank.txt")])
            .unwrap();
        assert_eq!(report.indexed, 0);
        assert!(!store.is_initialized());
        assert!(!dir.path().join(INDEX_FILE).exists());
    }

    #[test]
    fn test_build_appends_to_existing_corpus() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), 1000);
        let docs = [Document::new("Rust is fast.", "r.txt")];
        store.build_from_documents(&docs).unwrap();
        store.build_from_documents(&docs).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_clear_removes_files() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), 1000);
        store
            .build_from_documents(&[Document::new("Rust is fast.", "r.txt")])
            .unwrap();
        store.clear().unwrap();

        assert!(!store.is_initialized());
        assert!(!dir.path().join(INDEX_FILE).exists());
        assert!(!dir.path().join(METADATA_FILE).exists());
    }

    #[test]
    fn test_non_finite_vectors_rejected() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), 1000);

        let err = store
            .add_embeddings(vec![vec![f32::NAN, 0.0], vec![1.0, 0.0]], None)
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::NonFiniteVector));
        assert!(!store.is_initialized());

        store.add_embeddings(vec![vec![1.0, 0.0]], None).unwrap();
        let err = store
            .add_embeddings(vec![vec![0.0, f32::INFINITY]], None)
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::NonFiniteVector));
        assert_eq!(store.len(), 1);

        let err = store.search_vector(&[f32::NAN, 0.0], 1).unwrap_err();
        assert!(matches!(err, VectorStoreError::NonFiniteVector));
    }

    fn saved_three(dir: &Path) -> VectorStore {
        let mut store = store_in(dir, 1000);
        store
            .add_embeddings(
                vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![2.0, 0.0]],
                Some(records(&["a", "b", "c"])),
            )
            .unwrap();
        store.save().unwrap();
        store
    }

    fn load_error(dir: &Path) -> Box<dyn Error> {
        store_in(dir, 1000).load().unwrap_err()
    }

    #[test]
    fn test_load_rejects_metadata_out_of_step_with_index() {
        let dir = tempdir().unwrap();
        saved_three(dir.path());
        let metadata_path = dir.path().join(METADATA_FILE);
        let mut persisted: PersistedMetadata =
            serde_yaml::from_str(&fs::read_to_string(&metadata_path).unwrap()).unwrap();
        assert_eq!(persisted.count, 3);

        // records trimmed, count left as saved
        persisted.records.truncate(1);
        fs::write(&metadata_path, serde_yaml::to_string(&persisted).unwrap()).unwrap();
        assert!(matches!(
            load_error(dir.path()).downcast_ref::<VectorStoreError>(),
            Some(VectorStoreError::MetadataMismatch { vectors: 3, metadata: 1 })
        ));

        // count agrees with records, but the index still holds three vectors
        persisted.count = 1;
        fs::write(&metadata_path, serde_yaml::to_string(&persisted).unwrap()).unwrap();
        assert!(matches!(
            load_error(dir.path()).downcast_ref::<VectorStoreError>(),
            Some(VectorStoreError::MetadataMismatch { vectors: 3, metadata: 1 })
        ));

        persisted = PersistedMetadata {
            dimension: 3,
            count: 3,
            records: records(&["a", "b", "c"]),
        };
        fs::write(&metadata_path, serde_yaml::to_string(&persisted).unwrap()).unwrap();
        assert!(matches!(
            load_error(dir.path()).downcast_ref::<VectorStoreError>(),
            Some(VectorStoreError::DimensionMismatch { expected: 3, found: 2 })
        ));
    }

    #[test]
    fn test_load_rejects_empty_or_truncated_index() {
        let dir = tempdir().unwrap();
        saved_three(dir.path());
        let index_path = dir.path().join(INDEX_FILE);
        let bytes = fs::read(&index_path).unwrap();

        fs::write(&index_path, b"").unwrap();
        assert!(matches!(
            load_error(dir.path()).downcast_ref::<VectorStoreError>(),
            Some(VectorStoreError::Index(_))
        ));

        fs::write(&index_path, &bytes[..bytes.len() / 2]).unwrap();
        assert!(matches!(
            load_error(dir.path()).downcast_ref::<VectorStoreError>(),
            Some(VectorStoreError::Index(_))
        ));
    }

    #[test]
    fn test_save_replaces_files_without_leftovers() {
        let dir = tempdir().unwrap();
        let mut store = saved_three(dir.path());
        store.add_embeddings(vec![vec![3.0, 0.0]], None).unwrap();
        store.save().unwrap();

        let mut names: Vec<String> = fs::read_dir(store.persist_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![INDEX_FILE, METADATA_FILE]);

        let mut reloaded = store_in(dir.path(), 1000);
        reloaded.load().unwrap();
        assert_eq!(reloaded.len(), 4);
        assert_eq!(reloaded.search_vector(&[3.0, 0.0], 1).unwrap()[0].score, 0.0);
    }
}
