//! # Retrieval + answer
//!
//! [`RagSearch`] retrieves the chunks closest to a question, stitches them into a context
//! block and asks the language model to answer against it.
//!
//! Two conditions are answered without calling the model:
//! - the store has no index: [`EMPTY_STORE_MESSAGE`];
//! - the query returned nothing: [`NO_RESULTS_MESSAGE`].

use std::error::Error;

use tracing::{debug, info};

use crate::llm::LanguageModel;
use crate::template::PromptTemplate;
use crate::vector_store::{QueryResult, VectorStore};

pub const EMPTY_STORE_MESSAGE: &str = "Vector store is empty. Please upload documents first.";
pub const NO_RESULTS_MESSAGE: &str = "No relevant documents found.";

/// Join result texts, closest first, separated by blank lines.
pub fn build_context(results: &[QueryResult]) -> String {
    results
        .iter()
        .map(|r| r.metadata.text.as_str())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub struct RagSearch {
    store: VectorStore,
    llm: Box<dyn LanguageModel>,
    template: PromptTemplate,
}

impl RagSearch {
    pub fn new(store: VectorStore, llm: Box<dyn LanguageModel>, template: PromptTemplate) -> Self {
        Self {
            store,
            llm,
            template,
        }
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut VectorStore {
        &mut self.store
    }

    /// Answer `query` from the `top_k` closest chunks.
    ///
    /// # Errors
    /// Embedding and language-model failures propagate unchanged.
    pub async fn search_and_summarize(&self, query: &str, top_k: usize) -> Result<String, Box<dyn Error>> {
        if !self.store.is_initialized() {
            return Ok(EMPTY_STORE_MESSAGE.to_string());
        }

        let results = self.store.query(query, top_k)?;
        if results.is_empty() {
            return Ok(NO_RESULTS_MESSAGE.to_string());
        }

        let context = build_context(&results);
        let prompt = self.template.render(&context, query);
        info!("Answering from {} retrieved chunks", results.len());
        debug!("Prompt: {}", prompt);

        self.llm.complete(&prompt).await
    }
}
