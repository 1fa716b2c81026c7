//! Entry point of the `rag` command-line application.
//!
//! Parses the command line, loads configuration, starts the [`RagService`] and runs one
//! operation against it.
//!
//! # Examples
//!
//! ```sh
//! rag init
//! rag upload ./handbook.pdf
//! rag ask "What does the handbook say about holidays?"
//! rag search "holidays" -k 3 --json
//! rag reindex --fresh
//! rag health
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::{error::Error, fs, path::Path};

use clap::Parser;
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use rag_llm::{
    commands::{Cli, Commands},
    config,
    embedding::SentenceEmbeddingsModel,
    llm::OpenAiChat,
    pretty::print_pretty,
    service::{RagService, UploadOutcome},
};

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .init();
    });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => rag_llm::default_config_path()?,
    };

    match cli.command {
        Commands::Init => {
            let config = rag_llm::init(&config_path)?;
            println!("Config: {}", config_path.display());
            println!("Data folder: {}", config.data_dir.display());
        }
        Commands::Health => {
            let service = start_service(&config_path)?;
            println!("{}", serde_json::to_string_pretty(&service.health())?);
        }
        Commands::Ask { question } => {
            let service = start_service(&config_path)?;
            debug!("Asking question: {}", question);
            let answer = service.ask(&question).await?;
            print_pretty(&answer)?;
        }
        Commands::Upload { path } => {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| format!("Not a file path: {}", path.display()))?
                .to_string();
            let bytes = fs::read(&path)?;
            let mut service = start_service(&config_path)?;
            match service.upload(&file_name, &bytes)? {
                UploadOutcome::Indexed { message, report } => {
                    info!(
                        "{} documents, {} chunks, {} indexed, {} skipped",
                        report.documents, report.chunks, report.indexed, report.skipped
                    );
                    println!("{message}");
                    println!("Stored under {}", service.data_dir().display());
                }
                UploadOutcome::Rejected { error } => return Err(error.into()),
            }
        }
        Commands::Reindex { fresh } => {
            let mut service = start_service(&config_path)?;
            let report = service.reindex(fresh)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Search { text, top_k, json } => {
            let service = start_service(&config_path)?;
            let results = service.search(&text, top_k)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for (rank, result) in results.iter().enumerate() {
                    println!("{}. [{:.4}] {}", rank + 1, result.score, result.metadata.text);
                }
            }
        }
    }

    Ok(())
}

/// Load configuration and the embedding model, then open the store.
fn start_service(config_path: &Path) -> Result<RagService, Box<dyn Error>> {
    let mut rag_config = config::load_or_default(config_path)?;
    rag_config.apply_env();
    debug!("Config loaded: model={} top_k={}", rag_config.model, rag_config.top_k);
    if rag_config.api_key.is_empty() {
        warn!("No API key configured; set GROQ_API_KEY or api_key in {}", config_path.display());
    }

    let embedder = SentenceEmbeddingsModel::load(&rag_config.embedding_model)?;
    info!("Embedding vectors are {}-d", embedder.dimension());
    let llm = OpenAiChat::from_config(&rag_config);
    RagService::start(&rag_config, Box::new(embedder), Box::new(llm))
}
