//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "helpdesk-rag")]
#[command(about = "Helpdesk RAG - knowledge base retrieval operations", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .helpdesk-rag/
    #[arg(short, long, global = true, env = "HELPDESK_RAG_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the embedding provider and the vector database end to end
    Health,

    /// Create the vector collection, migrating it if the embedding dimension changed
    EnsureCollection,

    /// Embed a query and run a raw vector search (no publication filtering)
    Search {
        /// Query text (positional argument)
        query: String,

        /// Number of results (defaults to retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Restrict results to one knowledge base
        #[arg(long)]
        kb: Option<String>,
    },
}
