//! Lorebook - retrieval-augmented chat service library
//!
//! This library answers user questions by combining a local knowledge
//! base (vectorized document chunks) with an LLM generator inside
//! multi-turn chat sessions, falling back to live web search when local
//! knowledge is insufficient.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `pipeline`: the conversational retrieval-and-answer pipeline
//!   (window, query composition, retrieval fallback, grounded
//!   generation, auto-titling, session orchestration)
//! - `providers`: capability traits and clients (Gemini, SerpAPI)
//! - `index`: local vector index over ingested document chunks
//! - `storage`: chat and message persistence
//! - `ingest`: document chunking and indexing
//! - `server`: the HTTP API layer
//! - `config`: configuration management
//! - `error`: error types and result alias
//!
//! # Example
//!
//! ```no_run
//! use lorebook::config::Config;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::load("config/config.yaml")?;
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod index;
pub mod ingest;
pub mod pipeline;
pub mod providers;
pub mod server;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{LorebookError, Result};
pub use pipeline::{ChatService, MessageReply, PostMessageRequest};
pub use providers::Passage;
pub use storage::{ChatRecord, ChatStore, MessageRecord, SourceRef};

#[cfg(test)]
pub mod test_utils;
