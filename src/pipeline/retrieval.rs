//! Retrieval engine with layered fallback
//!
//! Queries the local vector index through an explicit ordered list of
//! strategies, applies the relevance filter, and falls back to live web
//! search only when the local result set is actually empty. Transport
//! errors from any retrieval layer never escape this module; the engine
//! degrades to progressively cheaper strategies and finally to an empty
//! passage set.

use crate::providers::{Passage, VectorIndex, WebSearch};
use std::sync::Arc;

/// Distance at or above which a scored candidate is rejected
///
/// Scores are distances: larger = less relevant. Candidates strictly
/// below the cutoff are kept.
pub const RELEVANCE_CUTOFF: f32 = 0.8;

/// Local retrieval strategies, tried in order
///
/// The engine advances to the next strategy only when the current one
/// fails; a successful-but-empty result ends the local phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalStrategy {
    /// Scored similarity search with relevance filtering
    Scored,
    /// Unscored similarity search, no filtering
    Unscored,
    /// Generic retrieval fallback
    Generic,
}

const LOCAL_STRATEGIES: [LocalStrategy; 3] = [
    LocalStrategy::Scored,
    LocalStrategy::Unscored,
    LocalStrategy::Generic,
];

/// Where the returned passages came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalOrigin {
    /// Local vector index
    Local,
    /// Live web search fallback
    Web,
    /// Nothing retrieved
    Empty,
}

/// Result of a retrieval run
#[derive(Debug, Clone)]
pub struct Retrieval {
    /// Retrieved passages, most relevant first
    pub passages: Vec<Passage>,
    /// Which layer produced them
    pub origin: RetrievalOrigin,
}

/// Retrieval engine over the local index and web search capabilities
pub struct RetrievalEngine {
    index: Arc<dyn VectorIndex>,
    web: Arc<dyn WebSearch>,
}

impl RetrievalEngine {
    /// Create a new engine from its capabilities
    pub fn new(index: Arc<dyn VectorIndex>, web: Arc<dyn WebSearch>) -> Self {
        Self { index, web }
    }

    /// Retrieve passages for a composed query
    ///
    /// Never fails: local strategy errors advance the chain, web-search
    /// errors are swallowed, and the worst case is an empty result.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Retrieval {
        let mut local = Vec::new();

        for strategy in LOCAL_STRATEGIES {
            match self.run_local(strategy, query, top_k).await {
                Ok(passages) => {
                    tracing::debug!(
                        "Local retrieval via {:?} returned {} passages",
                        strategy,
                        passages.len()
                    );
                    local = passages;
                    break;
                }
                Err(e) => {
                    tracing::debug!("Local retrieval via {:?} failed: {}", strategy, e);
                }
            }
        }

        if !local.is_empty() {
            return Retrieval {
                passages: local,
                origin: RetrievalOrigin::Local,
            };
        }

        // Local knowledge exhausted (either no candidates or everything
        // filtered out); try the web before giving up.
        match self.web.search(query, top_k).await {
            Ok(results) if !results.is_empty() => {
                tracing::info!("Web fallback returned {} passages", results.len());
                Retrieval {
                    passages: results,
                    origin: RetrievalOrigin::Web,
                }
            }
            Ok(_) => Retrieval {
                passages: Vec::new(),
                origin: RetrievalOrigin::Empty,
            },
            Err(e) => {
                tracing::debug!("Web fallback failed: {}", e);
                Retrieval {
                    passages: Vec::new(),
                    origin: RetrievalOrigin::Empty,
                }
            }
        }
    }

    /// Generic-tier retrieval, errors included
    ///
    /// Used by the one-shot answer path, which wants the plain retriever
    /// behavior without the fallback chain.
    pub async fn retrieve_generic(
        &self,
        query: &str,
        top_k: usize,
    ) -> crate::error::Result<Vec<Passage>> {
        self.index.retrieve(query, top_k).await
    }

    async fn run_local(
        &self,
        strategy: LocalStrategy,
        query: &str,
        top_k: usize,
    ) -> crate::error::Result<Vec<Passage>> {
        match strategy {
            LocalStrategy::Scored => {
                let scored = self.index.search_with_scores(query, top_k).await?;
                Ok(filter_relevant(scored))
            }
            LocalStrategy::Unscored => self.index.search(query, top_k).await,
            LocalStrategy::Generic => self.index.retrieve(query, top_k).await,
        }
    }
}

/// Keep candidates strictly below the relevance cutoff, order preserved
fn filter_relevant(scored: Vec<(Passage, f32)>) -> Vec<Passage> {
    scored
        .into_iter()
        .filter(|(_, score)| *score < RELEVANCE_CUTOFF)
        .map(|(passage, _)| passage)
        .collect()
}
