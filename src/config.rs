//! This module provides functionality for loading and handling the application's configuration.
//!
//! It defines the `RagConfig` struct, which holds the configuration parameters,
//! and functions to load it from a YAML file and apply environment overrides.
//!
//! # Examples
//!
//! Loading the configuration from a file:
//!
//! ```no_run
//! use rag_llm::config::load_config;
//!
//! let mut config = load_config("/path/to/config.yaml").unwrap();
//! config.apply_env();
//! println!("{:?}", config.model);
//! ```
//!
//! Every key is optional; missing keys take the values of [`RagConfig::default`]:
//!
//! ```yaml
//! api_key: ""
//! api_base: "https://api.groq.com/openai/v1"
//! model: "llama-3.1-8b-instant"
//! embedding_model: "sentence-transformers/all-MiniLM-L6-v2"
//! chunk_size: 1000
//! chunk_overlap: 200
//! top_k: 3
//! persist_dir: "vector_store"
//! data_dir: "data"
//! # prompt_template: "Context:\n{context}\n\nQ: {question}\nA:"
//! ```

use serde::{Deserialize, Serialize};
use std::{
    env,
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use tracing::*;

use crate::embedding::DEFAULT_EMBEDDING_MODEL;
use crate::llm::{DEFAULT_API_BASE, DEFAULT_MODEL};

/// Represents the application's configuration.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct RagConfig {
    /// The API key used to authenticate requests to the chat API.
    pub api_key: String,

    /// The base URL of the OpenAI-compatible chat API.
    pub api_base: String,

    /// The chat model used to generate answers.
    pub model: String,

    /// Hugging Face id of the sentence embedding model.
    pub embedding_model: String,

    /// Maximum chunk length in characters.
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question.
    pub top_k: usize,

    /// Directory holding the persisted index and metadata.
    pub persist_dir: PathBuf,

    /// Directory uploads are written to and documents are loaded from.
    pub data_dir: PathBuf,

    /// Replacement answer prompt; must contain `{context}` and `{question}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
            persist_dir: PathBuf::from("vector_store"),
            data_dir: PathBuf::from("data"),
            prompt_template: None,
        }
    }
}

impl RagConfig {
    /// Apply overrides from the process environment.
    ///
    /// - `GROQ_API_KEY`, falling back to `OPENAI_API_KEY`: API key.
    /// - `RAG_API_BASE`: API base URL.
    /// - `RAG_MODEL`: chat model.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| env::var(key).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("GROQ_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            debug!("API key taken from environment");
            self.api_key = key;
        }
        if let Some(base) = lookup("RAG_API_BASE") {
            self.api_base = base;
        }
        if let Some(model) = lookup("RAG_MODEL") {
            self.model = model;
        }
    }
}

/// Loads the application's configuration from a YAML file.
///
/// # Errors
/// The file cannot be read or is not valid YAML for [`RagConfig`].
pub fn load_config(file: impl AsRef<Path>) -> Result<RagConfig, Box<dyn Error>> {
    let file = file.as_ref();
    debug!("Loading config from: {}", file.display());
    let content = fs::read_to_string(file)?;
    let config: RagConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields [`RagConfig::default`].
pub fn load_or_default(file: impl AsRef<Path>) -> Result<RagConfig, Box<dyn Error>> {
    let file = file.as_ref();
    if file.exists() {
        load_config(file)
    } else {
        info!("No config at {}; using defaults", file.display());
        Ok(RagConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_valid_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
api_key: "example_api_key"
api_base: "http://example.com"
model: "example_model"
chunk_size: 500
top_k: 5
persist_dir: "/tmp/store"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();

        assert_eq!(config.api_key, "example_api_key");
        assert_eq!(config.api_base, "http://example.com");
        assert_eq!(config.model, "example_model");
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.persist_dir, PathBuf::from("/tmp/store"));
        // unspecified keys fall back to defaults
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.embedding_model, DEFAULT_EMBEDDING_MODEL);
    }

    #[test]
    fn test_load_config_invalid_file() {
        assert!(load_config("non/existent/path").is_err());
    }

    #[test]
    fn test_load_config_invalid_format() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, r#"invalid: config: format"#).unwrap();

        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = load_or_default("non/existent/config.yaml").unwrap();
        assert_eq!(config, RagConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "openai-key"),
            ("RAG_MODEL", "mixtral"),
        ]);
        let mut config = RagConfig::default();
        config.apply_env_from(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key, "openai-key");
        assert_eq!(config.model, "mixtral");
        assert_eq!(config.api_base, DEFAULT_API_BASE);

        let env: HashMap<&str, &str> =
            HashMap::from([("GROQ_API_KEY", "groq-key"), ("OPENAI_API_KEY", "openai-key")]);
        config.apply_env_from(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key, "groq-key");
    }

    #[test]
    fn test_default_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&RagConfig::default()).unwrap();
        let config: RagConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config, RagConfig::default());
    }
}
