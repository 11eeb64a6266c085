//! Shared stubs for integration tests
//!
//! Scriptable capability implementations mirroring the behavior knobs the
//! pipeline cares about: per-tier index outcomes, web search outcomes,
//! and a reply-scripted generator.

// Not every suite uses every stub
#![allow(dead_code)]

use lorebook::error::{LorebookError, Result};
use lorebook::pipeline::ChatService;
use lorebook::providers::{Passage, TextGenerator, VectorIndex, WebSearch};
use lorebook::storage::ChatStore;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Scriptable outcome: a value or an error message
pub type Scripted<T> = std::result::Result<T, String>;

/// Generator replaying scripted replies; the last one repeats forever
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Scripted<String>>>,
    pub calls: Mutex<Vec<(String, f32)>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Scripted<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn always(reply: &str) -> Arc<Self> {
        Self::new(vec![Ok(reply.to_string())])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), temperature));

        let mut replies = self.replies.lock().unwrap();
        let reply = match replies.len() {
            0 => return Err(LorebookError::Provider("no scripted reply".to_string()).into()),
            1 => replies.front().cloned().unwrap(),
            _ => replies.pop_front().unwrap(),
        };
        reply.map_err(|msg| LorebookError::Provider(msg).into())
    }
}

/// Index with fixed per-tier outcomes
pub struct ScriptedIndex {
    pub scored: Scripted<Vec<(Passage, f32)>>,
    pub unscored: Scripted<Vec<Passage>>,
    pub generic: Scripted<Vec<Passage>>,
}

impl ScriptedIndex {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            scored: Ok(Vec::new()),
            unscored: Ok(Vec::new()),
            generic: Ok(Vec::new()),
        })
    }

    pub fn with_scored(results: Vec<(Passage, f32)>) -> Arc<Self> {
        Arc::new(Self {
            scored: Ok(results),
            unscored: Ok(Vec::new()),
            generic: Ok(Vec::new()),
        })
    }

    pub fn with_generic(results: Vec<Passage>) -> Arc<Self> {
        Arc::new(Self {
            scored: Ok(Vec::new()),
            unscored: Ok(Vec::new()),
            generic: Ok(results),
        })
    }
}

#[async_trait]
impl VectorIndex for ScriptedIndex {
    async fn search_with_scores(&self, _query: &str, k: usize) -> Result<Vec<(Passage, f32)>> {
        match &self.scored {
            Ok(results) => Ok(results.iter().take(k).cloned().collect()),
            Err(msg) => Err(LorebookError::Index(msg.clone()).into()),
        }
    }

    async fn search(&self, _query: &str, k: usize) -> Result<Vec<Passage>> {
        match &self.unscored {
            Ok(results) => Ok(results.iter().take(k).cloned().collect()),
            Err(msg) => Err(LorebookError::Index(msg.clone()).into()),
        }
    }

    async fn retrieve(&self, _query: &str, k: usize) -> Result<Vec<Passage>> {
        match &self.generic {
            Ok(results) => Ok(results.iter().take(k).cloned().collect()),
            Err(msg) => Err(LorebookError::Index(msg.clone()).into()),
        }
    }
}

/// Web search with a fixed outcome and recorded queries
pub struct ScriptedWeb {
    pub outcome: Scripted<Vec<Passage>>,
    pub queries: Mutex<Vec<(String, usize)>>,
}

impl ScriptedWeb {
    pub fn with_results(results: Vec<Passage>) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(results),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            outcome: Err("SERPAPI_API_KEY not set".to_string()),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl WebSearch for ScriptedWeb {
    async fn search(&self, query: &str, num: usize) -> Result<Vec<Passage>> {
        self.queries.lock().unwrap().push((query.to_string(), num));
        match &self.outcome {
            Ok(results) => Ok(results.iter().take(num).cloned().collect()),
            Err(msg) => Err(LorebookError::MissingCredentials(msg.clone()).into()),
        }
    }
}

/// A service over a temp store and the given capabilities
pub fn build_service(
    index: Arc<dyn VectorIndex>,
    web: Arc<dyn WebSearch>,
    llm: Arc<dyn TextGenerator>,
) -> (tempfile::TempDir, Arc<ChatStore>, ChatService) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let store = Arc::new(ChatStore::open(dir.path().join("chats.db")).expect("Failed to open store"));
    let service = ChatService::new(store.clone(), index, web, llm);
    (dir, store, service)
}
