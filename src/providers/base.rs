//! Capability traits and common types for Lorebook
//!
//! This module defines the external capability interfaces the pipeline
//! consumes: text generation, embeddings, vector-index search, and web
//! search. The pipeline owns no clients itself; capability objects are
//! constructed at startup and passed in, so tests can substitute stubs
//! and the fallback behavior stays observable.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A unit of retrieved text used as grounding context for generation
///
/// Passages are ephemeral: produced by retrieval (local index or web
/// search), consumed by answer generation, and frozen into a message's
/// source snapshot when persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    /// Retrieved text content
    pub content: String,
    /// Origin of the passage (file path or URL), when known
    pub source: Option<String>,
    /// Relevance score as a distance; lower = more relevant. Absent for
    /// unscored retrieval tiers and web results.
    pub score: Option<f32>,
}

impl Passage {
    /// Creates a passage with no score
    ///
    /// # Examples
    ///
    /// ```
    /// use lorebook::providers::Passage;
    ///
    /// let p = Passage::new("Rust is a systems language", Some("intro.md".to_string()));
    /// assert_eq!(p.source.as_deref(), Some("intro.md"));
    /// assert!(p.score.is_none());
    /// ```
    pub fn new(content: impl Into<String>, source: Option<String>) -> Self {
        Self {
            content: content.into(),
            source,
            score: None,
        }
    }

    /// Creates a passage carrying a relevance score
    ///
    /// # Examples
    ///
    /// ```
    /// use lorebook::providers::Passage;
    ///
    /// let p = Passage::scored("content", Some("doc.txt".to_string()), 0.25);
    /// assert_eq!(p.score, Some(0.25));
    /// ```
    pub fn scored(content: impl Into<String>, source: Option<String>, score: f32) -> Self {
        Self {
            content: content.into(),
            source,
            score: Some(score),
        }
    }
}

/// Text generation capability
///
/// A single-shot prompt-to-text completion. Used for both answer
/// generation and (at temperature 0) title generation; the two uses are
/// independent invocations of the same capability, not separate
/// components.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the given prompt
    ///
    /// # Arguments
    ///
    /// * `prompt` - Full prompt text
    /// * `temperature` - Sampling temperature (0.0 = deterministic)
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails or the response is malformed.
    /// Callers treat this as a fatal generation failure; it is not part of
    /// the retrieval fallback chain.
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String>;
}

/// Embedding capability
///
/// Converts text into a dense vector. Consumed by the vector index for
/// both ingestion and query embedding.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a text into a vector
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails or the response is malformed
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Similarity-search capability over the local knowledge base
///
/// Exposes three progressively degraded tiers. The retrieval engine tries
/// them in order and advances on failure only:
///
/// 1. [`search_with_scores`](VectorIndex::search_with_scores) - scored
///    search; scores are distances (lower = more relevant) and feed the
///    relevance filter.
/// 2. [`search`](VectorIndex::search) - unscored search, no filtering.
/// 3. [`retrieve`](VectorIndex::retrieve) - generic retrieval that must
///    not depend on the embedding capability.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Scored similarity search; results ordered most-relevant first
    async fn search_with_scores(&self, query: &str, k: usize) -> Result<Vec<(Passage, f32)>>;

    /// Unscored similarity search
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>>;

    /// Generic retrieval fallback
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>>;
}

/// Live web-search capability
///
/// Implementations fail when no credential is configured; callers in the
/// pipeline tolerate that failure silently and continue with what they
/// have.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Search the web, returning up to `num` passages
    async fn search(&self, query: &str, num: usize) -> Result<Vec<Passage>>;
}
