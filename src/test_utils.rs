//! Test utilities for Lorebook
//!
//! Stub implementations of the capability traits so pipeline unit tests
//! can script provider behavior and observe how the fallback chain
//! advances. Compiled only for tests.

use crate::error::{LorebookError, Result};
use crate::providers::{EmbeddingProvider, Passage, TextGenerator, VectorIndex, WebSearch};

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Scriptable outcome: a value or an error message
pub type Scripted<T> = std::result::Result<T, String>;

/// Text generator that replays scripted replies in order
///
/// Records every call (prompt, temperature) for assertions. Runs out of
/// script -> errors, which keeps tests honest about call counts.
pub struct StubGenerator {
    replies: Mutex<VecDeque<Scripted<String>>>,
    pub calls: Mutex<Vec<(String, f32)>>,
}

impl StubGenerator {
    /// Stub that answers each call with the next scripted reply
    pub fn scripted(replies: Vec<Scripted<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Stub that always succeeds with clones of one reply
    ///
    /// The final scripted reply is never drained, so it acts as the
    /// fallback for any further calls.
    pub fn always(reply: &str) -> Self {
        Self::scripted(vec![Ok(reply.to_string())])
    }

    /// Number of generation calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Prompt of the `n`-th call
    pub fn prompt(&self, n: usize) -> String {
        self.calls.lock().unwrap()[n].0.clone()
    }

    /// Temperature of the `n`-th call
    pub fn temperature(&self, n: usize) -> f32 {
        self.calls.lock().unwrap()[n].1
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), temperature));

        let mut replies = self.replies.lock().unwrap();
        match replies.len() {
            0 => Err(LorebookError::Provider("no scripted reply left".to_string()).into()),
            1 => {
                // Keep the last reply as a reusable template
                let reply = replies.front().cloned().unwrap();
                reply.map_err(|msg| LorebookError::Provider(msg).into())
            }
            _ => {
                let reply = replies.pop_front().unwrap();
                reply.map_err(|msg| LorebookError::Provider(msg).into())
            }
        }
    }
}

/// Embedding provider with deterministic vectors
pub struct StubEmbedder {
    map: HashMap<String, Vec<f32>>,
    constant: Option<Vec<f32>>,
    fail: bool,
}

impl StubEmbedder {
    /// Known texts map to fixed vectors; unknown texts map to zeros
    pub fn axis_mapped(entries: Vec<(String, Vec<f32>)>) -> Self {
        Self {
            map: entries.into_iter().collect(),
            constant: None,
            fail: false,
        }
    }

    /// Every text maps to the same vector
    pub fn constant(vector: Vec<f32>) -> Self {
        Self {
            map: HashMap::new(),
            constant: Some(vector),
            fail: false,
        }
    }

    /// Every call fails
    pub fn failing() -> Self {
        Self {
            map: HashMap::new(),
            constant: None,
            fail: true,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(LorebookError::Provider("embedding unavailable".to_string()).into());
        }
        if let Some(vector) = &self.constant {
            return Ok(vector.clone());
        }
        if let Some(vector) = self.map.get(text) {
            return Ok(vector.clone());
        }
        let dim = self.map.values().next().map(|v| v.len()).unwrap_or(1);
        Ok(vec![0.0; dim])
    }
}

/// Vector index with per-tier scripted outcomes and call counters
pub struct StubIndex {
    pub scored: Scripted<Vec<(Passage, f32)>>,
    pub unscored: Scripted<Vec<Passage>>,
    pub generic: Scripted<Vec<Passage>>,
    pub scored_calls: Mutex<usize>,
    pub unscored_calls: Mutex<usize>,
    pub generic_calls: Mutex<usize>,
}

impl StubIndex {
    /// Index where every tier succeeds with an empty result
    pub fn empty() -> Self {
        Self {
            scored: Ok(Vec::new()),
            unscored: Ok(Vec::new()),
            generic: Ok(Vec::new()),
            scored_calls: Mutex::new(0),
            unscored_calls: Mutex::new(0),
            generic_calls: Mutex::new(0),
        }
    }

    /// Index whose scored tier returns the given results
    pub fn with_scored(results: Vec<(Passage, f32)>) -> Self {
        Self {
            scored: Ok(results),
            ..Self::empty()
        }
    }
}

#[async_trait]
impl VectorIndex for StubIndex {
    async fn search_with_scores(&self, _query: &str, k: usize) -> Result<Vec<(Passage, f32)>> {
        *self.scored_calls.lock().unwrap() += 1;
        match &self.scored {
            Ok(results) => Ok(results.iter().take(k).cloned().collect()),
            Err(msg) => Err(LorebookError::Index(msg.clone()).into()),
        }
    }

    async fn search(&self, _query: &str, k: usize) -> Result<Vec<Passage>> {
        *self.unscored_calls.lock().unwrap() += 1;
        match &self.unscored {
            Ok(results) => Ok(results.iter().take(k).cloned().collect()),
            Err(msg) => Err(LorebookError::Index(msg.clone()).into()),
        }
    }

    async fn retrieve(&self, _query: &str, k: usize) -> Result<Vec<Passage>> {
        *self.generic_calls.lock().unwrap() += 1;
        match &self.generic {
            Ok(results) => Ok(results.iter().take(k).cloned().collect()),
            Err(msg) => Err(LorebookError::Index(msg.clone()).into()),
        }
    }
}

/// Web search with one scripted outcome and recorded queries
pub struct StubWebSearch {
    pub outcome: Scripted<Vec<Passage>>,
    pub queries: Mutex<Vec<(String, usize)>>,
}

impl StubWebSearch {
    /// Search that succeeds with the given results
    pub fn with_results(results: Vec<Passage>) -> Self {
        Self {
            outcome: Ok(results),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Search that always fails (e.g. no credential configured)
    pub fn failing() -> Self {
        Self {
            outcome: Err("SERPAPI_API_KEY not set".to_string()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Number of search calls made so far
    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    /// Query string of the `n`-th call
    pub fn query(&self, n: usize) -> String {
        self.queries.lock().unwrap()[n].0.clone()
    }
}

#[async_trait]
impl WebSearch for StubWebSearch {
    async fn search(&self, query: &str, num: usize) -> Result<Vec<Passage>> {
        self.queries.lock().unwrap().push((query.to_string(), num));
        match &self.outcome {
            Ok(results) => Ok(results.iter().take(num).cloned().collect()),
            Err(msg) => Err(LorebookError::MissingCredentials(msg.clone()).into()),
        }
    }
}
