//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum with one subcommand per service operation.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use rag_llm::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! match cli.command {
//!     Commands::Ask { question } => println!("asking {question}"),
//!     _ => {}
//! }
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Configuration file. Defaults to `config.yaml` in the platform config directory.
    #[arg(short, long, global = true, env = "RAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug, PartialEq)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Report service status and the number of indexed chunks.
    Health,

    /// Answer a question from the indexed documents.
    #[clap(name = "ask", alias = "a")]
    Ask {
        /// The question to be answered.
        question: String,
    },

    /// Copy a pdf, txt or csv file into the data folder and rebuild the index.
    Upload {
        /// Path of the file to upload.
        path: PathBuf,
    },

    /// Re-ingest the data folder.
    Reindex {
        /// Drop the existing index first instead of appending to it.
        #[arg(long)]
        fresh: bool,
    },

    /// Show the chunks closest to a query, without asking the model.
    Search {
        /// Text to search for.
        text: String,

        /// Number of results.
        #[arg(short = 'k', long = "top-k", default_value_t = 5)]
        top_k: usize,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration and create the data sub-folders.
    Init,
}
