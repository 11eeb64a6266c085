//! Local vector index
//!
//! A sled-backed chunk store with brute-force cosine-distance search,
//! implementing all three [`VectorIndex`] tiers: scored search, unscored
//! search, and a lexical term-overlap fallback that keeps working when the
//! embedding capability is unavailable.
//!
//! Scores are cosine distances (1 - cosine similarity): lower = more
//! relevant, which is what the retrieval engine's exclusion boundary
//! expects.

use crate::error::{LorebookError, Result};
use crate::providers::{EmbeddingProvider, Passage, VectorIndex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// A stored document chunk with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    /// Stable content-derived identifier
    pub id: String,
    /// Chunk text
    pub content: String,
    /// Origin of the chunk (file path), when known
    pub source: Option<String>,
    /// Embedding vector
    pub embedding: Vec<f32>,
}

/// Sled-backed vector store over document chunks
///
/// Search is a brute-force scan: every chunk's embedding is compared
/// against the query embedding. That is adequate for the knowledge-base
/// sizes this service targets; the store's interface is what the pipeline
/// depends on, not the scan.
pub struct LocalVectorStore {
    db: sled::Db,
    chunks: sled::Tree,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl LocalVectorStore {
    /// Open or create a vector store
    ///
    /// # Arguments
    ///
    /// * `path` - Database directory
    /// * `collection` - Tree name holding the chunks
    /// * `embedder` - Embedding capability used for queries and ingestion
    ///
    /// # Errors
    ///
    /// Returns `LorebookError::Index` if the database cannot be opened
    pub fn open(
        path: impl AsRef<Path>,
        collection: &str,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| LorebookError::Index(format!("Failed to open database: {}", e)))?;
        let chunks = db
            .open_tree(collection)
            .map_err(|e| LorebookError::Index(format!("Failed to open collection: {}", e)))?;
        Ok(Self {
            db,
            chunks,
            embedder,
        })
    }

    /// Number of chunks in the store
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the store holds no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embed and insert document chunks
    ///
    /// Each chunk gets a stable content-hash id, so re-ingesting the same
    /// file overwrites rather than duplicates.
    ///
    /// # Arguments
    ///
    /// * `documents` - `(content, source)` pairs
    ///
    /// # Returns
    ///
    /// The number of chunks inserted
    pub async fn add_documents(
        &self,
        documents: &[(String, Option<String>)],
    ) -> Result<usize> {
        let mut inserted = 0;
        for (content, source) in documents {
            if content.trim().is_empty() {
                continue;
            }
            let embedding = self.embedder.embed(content).await?;
            let chunk = IndexedChunk {
                id: chunk_id(content, source.as_deref()),
                content: content.clone(),
                source: source.clone(),
                embedding,
            };
            let value = serde_json::to_vec(&chunk)
                .map_err(|e| LorebookError::Index(format!("Serialization failed: {}", e)))?;
            self.chunks
                .insert(chunk.id.as_bytes(), value)
                .map_err(|e| LorebookError::Index(format!("Insert failed: {}", e)))?;
            inserted += 1;
        }
        self.db
            .flush_async()
            .await
            .map_err(|e| LorebookError::Index(format!("Flush failed: {}", e)))?;
        tracing::info!("Indexed {} chunks", inserted);
        Ok(inserted)
    }

    fn all_chunks(&self) -> Result<Vec<IndexedChunk>> {
        let mut chunks = Vec::new();
        for entry in self.chunks.iter() {
            let (_, value) =
                entry.map_err(|e| LorebookError::Index(format!("Iteration failed: {}", e)))?;
            let chunk: IndexedChunk = serde_json::from_slice(&value)
                .map_err(|e| LorebookError::Index(format!("Deserialization failed: {}", e)))?;
            chunks.push(chunk);
        }
        Ok(chunks)
    }

    async fn scored_scan(&self, query: &str, k: usize) -> Result<Vec<(Passage, f32)>> {
        let query_embedding = self.embedder.embed(query).await?;
        let mut scored: Vec<(IndexedChunk, f32)> = self
            .all_chunks()?
            .into_iter()
            .map(|chunk| {
                let distance = cosine_distance(&query_embedding, &chunk.embedding);
                (chunk, distance)
            })
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(chunk, distance)| {
                (
                    Passage::scored(chunk.content, chunk.source, distance),
                    distance,
                )
            })
            .collect())
    }
}

#[async_trait]
impl VectorIndex for LocalVectorStore {
    async fn search_with_scores(&self, query: &str, k: usize) -> Result<Vec<(Passage, f32)>> {
        self.scored_scan(query, k).await
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        let scored = self.scored_scan(query, k).await?;
        Ok(scored
            .into_iter()
            .map(|(mut passage, _)| {
                passage.score = None;
                passage
            })
            .collect())
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        // Lexical tier: term overlap against the query, no embeddings.
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(IndexedChunk, usize)> = self
            .all_chunks()?
            .into_iter()
            .filter_map(|chunk| {
                let overlap = terms(&chunk.content)
                    .intersection(&query_terms)
                    .count();
                if overlap > 0 {
                    Some((chunk, overlap))
                } else {
                    None
                }
            })
            .collect();

        // Highest overlap first; id as a deterministic tie-break
        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(chunk, _)| Passage::new(chunk.content, chunk.source))
            .collect())
    }
}

/// Stable chunk id from content and source
fn chunk_id(content: &str, source: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.unwrap_or_default().as_bytes());
    hasher.update(b"\x00");
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Cosine distance between two vectors (1 - cosine similarity)
///
/// Mismatched or zero-norm vectors yield 1.0, which the relevance filter
/// treats as irrelevant.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 1.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Lowercased alphanumeric terms of a text
fn terms(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
