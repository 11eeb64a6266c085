//! Chat session orchestration
//!
//! `ChatService` owns the per-message pipeline: validate the chat, persist
//! the user message, build the conversation window, compose the retrieval
//! query, retrieve passages, generate the answer (with its optional
//! web-assisted retry), persist the assistant message with its frozen
//! source snapshot, bump the chat's activity timestamp, and conditionally
//! retitle. Each message is processed synchronously end to end; there is
//! no cross-step parallelism and no resumability. A crash mid-pipeline
//! leaves the user message persisted with no assistant reply, recoverable
//! by resubmission.
//!
//! Concurrent messages run as independent tasks. Messages racing on the
//! same chat may interleave history reads and produce overlapping context;
//! that is accepted degradation, not corruption, since every message is
//! still persisted atomically.

use crate::error::{LorebookError, Result};
use crate::pipeline::generation::AnswerGenerator;
use crate::pipeline::query::compose_query;
use crate::pipeline::retrieval::RetrievalEngine;
use crate::pipeline::title::TitleMaintainer;
use crate::pipeline::window::{format_transcript, recent_window, WINDOW_SIZE};
use crate::providers::{TextGenerator, VectorIndex, WebSearch};
use crate::storage::{ChatRecord, ChatStore, MessageRecord, SourceRef};

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use ulid::Ulid;

/// Concise system instruction for the one-shot answer path
const ONE_SHOT_INSTRUCTION: &str = "You are a helpful assistant. Answer the user's question using the provided context. If the answer isn't in the context, say you don't know. Keep answers concise and cite sources when possible.";

/// Payload for posting a message into a chat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMessageRequest {
    /// Message content (required, non-empty)
    pub content: String,
    /// Number of passages to retrieve (1..=20)
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Sampling temperature (0.0..=1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Answer length hint in tokens (100..=4000)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_top_k() -> usize {
    4
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    1000
}

impl PostMessageRequest {
    /// Payload with defaults for everything but the content
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            top_k: default_top_k(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    /// Validate field ranges
    ///
    /// # Errors
    ///
    /// Returns `LorebookError::Validation` when a field is out of range
    pub fn validate(&self) -> Result<()> {
        if self.content.is_empty() {
            return Err(LorebookError::Validation("content must not be empty".into()).into());
        }
        if self.top_k < 1 || self.top_k > 20 {
            return Err(LorebookError::Validation("top_k must be within 1..=20".into()).into());
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(
                LorebookError::Validation("temperature must be within 0.0..=1.0".into()).into(),
            );
        }
        if self.max_tokens < 100 || self.max_tokens > 4000 {
            return Err(
                LorebookError::Validation("max_tokens must be within 100..=4000".into()).into(),
            );
        }
        Ok(())
    }
}

/// Result of posting a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReply {
    /// Generated answer text
    pub answer: String,
    /// Frozen source snapshot the answer was grounded on
    pub sources: Vec<SourceRef>,
    /// New chat title, present only when retitling fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A numbered source in a one-shot reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem {
    /// Position of the source in the context (1-based, as a string)
    pub id: Option<String>,
    /// Relevance score, when the retrieval tier provided one
    pub score: Option<f32>,
    /// Origin of the passage
    pub source: Option<String>,
    /// Passage content
    pub content: String,
}

/// Result of a one-shot question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneShotReply {
    /// Generated answer text
    pub answer: String,
    /// Sources used for grounding
    pub sources: Vec<SourceItem>,
}

/// Chat service wiring the pipeline stages over injected capabilities
pub struct ChatService {
    store: Arc<ChatStore>,
    retrieval: RetrievalEngine,
    answers: AnswerGenerator,
    titles: TitleMaintainer,
    llm: Arc<dyn TextGenerator>,
}

impl ChatService {
    /// Assemble the pipeline from its capability objects
    ///
    /// All capabilities are constructed by the caller and shared by
    /// reference; the service holds no global state beyond them.
    pub fn new(
        store: Arc<ChatStore>,
        index: Arc<dyn VectorIndex>,
        web: Arc<dyn WebSearch>,
        llm: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            retrieval: RetrievalEngine::new(index, web.clone()),
            answers: AnswerGenerator::new(llm.clone(), web),
            titles: TitleMaintainer::new(llm.clone()),
            llm,
            store,
        }
    }

    /// Create a new chat
    pub fn create_chat(&self, title: Option<String>) -> Result<ChatRecord> {
        self.store.create_chat(title)
    }

    /// List chats, most recently active first
    pub fn list_chats(&self) -> Result<Vec<ChatRecord>> {
        self.store.list_chats()
    }

    /// A chat with its messages in chronological order
    ///
    /// # Errors
    ///
    /// Returns `LorebookError::ChatNotFound` for an unknown id
    pub fn chat_with_messages(&self, chat_id: &str) -> Result<(ChatRecord, Vec<MessageRecord>)> {
        let chat = self
            .store
            .chat(chat_id)?
            .ok_or_else(|| LorebookError::ChatNotFound(chat_id.to_string()))?;
        let messages = self.store.messages(chat_id)?;
        Ok((chat, messages))
    }

    /// Delete a chat and its messages; unknown ids are a no-op
    pub fn delete_chat(&self, chat_id: &str) -> Result<()> {
        self.store.delete_chat(chat_id)
    }

    /// Attach feedback to a message
    ///
    /// # Errors
    ///
    /// `LorebookError::InvalidId` for a malformed message id,
    /// `LorebookError::MessageNotFound` for an unknown one
    pub fn message_feedback(&self, message_id: &str, feedback: &str) -> Result<MessageRecord> {
        if Ulid::from_str(message_id).is_err() {
            return Err(LorebookError::InvalidId(message_id.to_string()).into());
        }
        self.store
            .set_feedback(message_id, feedback)?
            .ok_or_else(|| LorebookError::MessageNotFound(message_id.to_string()).into())
    }

    /// Run the full message pipeline for a chat
    ///
    /// # Errors
    ///
    /// `Validation` for a bad payload, `ChatNotFound` before any state is
    /// mutated, and generation failures from the primary generation call.
    /// Retrieval and web-search failures never surface; they degrade
    /// inside the pipeline.
    pub async fn post_message(
        &self,
        chat_id: &str,
        request: PostMessageRequest,
    ) -> Result<MessageReply> {
        request.validate()?;

        // Abort before mutating anything when the chat is unknown
        self.store
            .chat(chat_id)?
            .ok_or_else(|| LorebookError::ChatNotFound(chat_id.to_string()))?;

        let user_message = MessageRecord::user(chat_id, &request.content);
        self.store.append_message(&user_message)?;

        // The window includes the message just persisted
        let all_messages = self.store.messages(chat_id)?;
        let window = recent_window(&all_messages, WINDOW_SIZE);
        let query = compose_query(window, &request.content);
        let history = format_transcript(window);

        let retrieval = self.retrieval.retrieve(&query, request.top_k).await;
        tracing::debug!(
            "Retrieved {} passages ({:?}) for chat {}",
            retrieval.passages.len(),
            retrieval.origin,
            chat_id
        );

        let generated = self
            .answers
            .answer(
                &request.content,
                &history,
                retrieval.passages,
                request.temperature,
                request.max_tokens,
            )
            .await?;

        let sources: Vec<SourceRef> = generated
            .passages
            .iter()
            .map(|p| SourceRef {
                source: p.source.clone(),
                content: p.content.clone(),
            })
            .collect();

        let assistant_message =
            MessageRecord::assistant(chat_id, &generated.answer, sources.clone());
        self.store.append_message(&assistant_message)?;
        self.store.touch_chat(chat_id)?;

        let title = self.refresh_title(chat_id, &history, &request.content).await;

        Ok(MessageReply {
            answer: generated.answer,
            sources,
            title,
        })
    }

    /// One-shot question answering outside any chat
    ///
    /// Uses the generic retrieval tier only and a concise instruction;
    /// an empty knowledge base is an error rather than a web fallback.
    pub async fn one_shot(
        &self,
        question: &str,
        top_k: usize,
        temperature: f32,
    ) -> Result<OneShotReply> {
        if question.is_empty() {
            return Err(LorebookError::Validation("question must not be empty".into()).into());
        }

        let passages = self.retrieval.retrieve_generic(question, top_k).await?;
        if passages.is_empty() {
            return Err(LorebookError::NoData(
                "No data found in the knowledge base. Please ingest documents first.".into(),
            )
            .into());
        }

        let context = passages
            .iter()
            .enumerate()
            .map(|(i, p)| {
                format!(
                    "[Source {}: {}]\n{}",
                    i + 1,
                    p.source.as_deref().unwrap_or("unknown"),
                    p.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "{}\n\nContext:\n{}\n\nQuestion: {}\nAnswer:",
            ONE_SHOT_INSTRUCTION, context, question
        );

        let answer = self.llm.generate(&prompt, temperature).await?;

        let sources = passages
            .iter()
            .enumerate()
            .map(|(i, p)| SourceItem {
                id: Some((i + 1).to_string()),
                score: p.score,
                source: p.source.clone(),
                content: p.content.clone(),
            })
            .collect();

        Ok(OneShotReply { answer, sources })
    }

    /// Retitle the chat when it still carries a sentinel title
    ///
    /// Returns the accepted title. Failures are non-fatal and leave the
    /// title unchanged.
    async fn refresh_title(&self, chat_id: &str, history: &str, fallback: &str) -> Option<String> {
        let current = match self.store.chat(chat_id) {
            Ok(Some(chat)) => chat.title,
            _ => return None,
        };

        let conversation = if history.is_empty() { fallback } else { history };
        let title = self.titles.maybe_retitle(&current, conversation).await?;

        match self.store.set_chat_title(chat_id, &title) {
            Ok(()) => {
                tracing::info!("Chat {} retitled to {:?}", chat_id, title);
                Some(title)
            }
            Err(e) => {
                tracing::debug!("Failed to persist title for chat {}: {}", chat_id, e);
                None
            }
        }
    }
}
