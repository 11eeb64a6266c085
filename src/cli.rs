//! Command-line interface definition for Lorebook
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for serving the HTTP API and ingesting documents.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lorebook - retrieval-augmented chat over a local knowledge base
///
/// Serve a chat API grounded in ingested documents, with live
/// web-search fallback when local knowledge is insufficient.
#[derive(Parser, Debug, Clone)]
#[command(name = "lorebook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Lorebook
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Override the bind host from config
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port from config
        #[arg(long)]
        port: Option<u16>,
    },

    /// Ingest documents into the knowledge base
    Ingest {
        /// Files or directories to ingest (.txt/.md)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
