//! # rag_llm (library root)
//!
//! Retrieval-augmented question answering over a folder of PDF, text and CSV files.
//!
//! Documents are loaded ([`loader`]), split into overlapping chunks ([`splitter`]),
//! embedded with a local sentence-transformer ([`embedding`]) and kept in a persistent
//! nearest-neighbour index ([`vector_store`]). A question is embedded the same way; the
//! closest chunks become the context of a prompt ([`template`]) sent to an
//! OpenAI-compatible chat model ([`llm`]) by [`search`]. [`service`] ties it together
//! behind the operations the `rag` binary exposes ([`commands`]).
//!
//! ```text
//! data/ ──loader──▶ Document ──splitter──▶ Chunk ──embedding──▶ Vec<f32>
//!                                                                  │
//! question ──embedding──▶ query vector ──vector_store (top k)◀─────┘
//!                                            │
//!                                 template + llm ──▶ answer
//! ```
//!
//! ## Modules
//! - [`commands`], [`config`], [`document`], [`embedding`], [`llm`], [`loader`],
//!   [`pretty`], [`search`], [`service`], [`splitter`], [`template`], [`vector_store`]

use directories::ProjectDirs;
use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

pub mod commands;
pub mod config;
pub mod document;
pub mod embedding;
pub mod llm;
pub mod loader;
pub mod pretty;
pub mod search;
pub mod service;
pub mod splitter;
pub mod template;
pub mod vector_store;

#[cfg(test)]
mod testing;

use config::RagConfig;
use loader::FileKind;

/// Return the per-platform configuration directory.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "rag-llm", "rag")`, e.g. `~/.config/rag` on Linux.
/// The directory is **not** created by this function.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be determined.
pub fn config_dir() -> Result<PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "rag-llm", "rag")
        .ok_or("Unable to determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Default configuration file location: `config_dir()/config.yaml`.
pub fn default_config_path() -> Result<PathBuf, Box<dyn Error>> {
    Ok(config_dir()?.join("config.yaml"))
}

/// Prepare a workspace: write a default config to `config_path` unless one exists, then
/// create one data sub-folder per supported file type.
///
/// Returns the configuration in effect.
pub fn init(config_path: &Path) -> Result<RagConfig, Box<dyn Error>> {
    let config = if config_path.exists() {
        info!("Keeping existing config: {}", config_path.display());
        config::load_config(config_path)?
    } else {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        info!("Creating config file: {}", config_path.display());
        let config = RagConfig::default();
        fs::write(config_path, serde_yaml::to_string(&config)?)?;
        config
    };

    for kind in FileKind::ALL {
        let folder = config.data_dir.join(kind.subfolder());
        info!("Creating data folder: {}", folder.display());
        fs::create_dir_all(folder)?;
    }
    Ok(config)
}
