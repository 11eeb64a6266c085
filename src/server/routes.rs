//! Route handlers
//!
//! Thin wrappers translating HTTP payloads into [`ChatService`] calls.

use crate::error::LorebookError;
use crate::pipeline::{MessageReply, OneShotReply, PostMessageRequest};
use crate::server::{ApiError, AppState};
use crate::storage::{ChatRecord, MessageRecord};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Payload for creating a chat
#[derive(Debug, Default, Deserialize)]
pub struct CreateChatRequest {
    /// Initial title; defaults to the "New chat" sentinel
    #[serde(default)]
    pub title: Option<String>,
}

/// Payload for message feedback
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    /// The feedback verdict
    pub feedback: Feedback,
}

/// Allowed feedback verdicts
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    /// Positive feedback
    Like,
    /// Negative feedback
    Dislike,
}

impl Feedback {
    fn as_str(&self) -> &'static str {
        match self {
            Feedback::Like => "like",
            Feedback::Dislike => "dislike",
        }
    }
}

/// Payload for the one-shot chat endpoint
#[derive(Debug, Deserialize)]
pub struct OneShotRequest {
    /// The question to answer
    pub question: String,
    /// Number of passages to retrieve (1..=20)
    #[serde(default = "default_one_shot_top_k")]
    pub top_k: usize,
    /// Sampling temperature (0.0..=1.0)
    #[serde(default = "default_one_shot_temperature")]
    pub temperature: f32,
}

fn default_one_shot_top_k() -> usize {
    4
}

fn default_one_shot_temperature() -> f32 {
    0.2
}

/// A chat together with its messages
#[derive(Debug, Serialize)]
pub struct ChatWithMessages {
    /// Chat metadata
    #[serde(flatten)]
    pub chat: ChatRecord,
    /// Messages in chronological order
    pub messages: Vec<MessageRecord>,
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /chats`
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ChatRecord>>, ApiError> {
    Ok(Json(state.service.list_chats()?))
}

/// `POST /chats`
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<CreateChatRequest>>,
) -> Result<Json<ChatRecord>, ApiError> {
    let title = payload.and_then(|Json(p)| p.title);
    Ok(Json(state.service.create_chat(title)?))
}

/// `GET /chats/{chat_id}`
pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatWithMessages>, ApiError> {
    let (chat, messages) = state.service.chat_with_messages(&chat_id)?;
    Ok(Json(ChatWithMessages { chat, messages }))
}

/// `DELETE /chats/{chat_id}`
pub async fn delete_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.service.delete_chat(&chat_id)?;
    Ok(Json(json!({ "deleted": true })))
}

/// `POST /chats/{chat_id}/messages`
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
    Json(payload): Json<PostMessageRequest>,
) -> Result<Json<MessageReply>, ApiError> {
    let reply = state.service.post_message(&chat_id, payload).await?;
    Ok(Json(reply))
}

/// `POST /chats/messages/{message_id}/feedback`
pub async fn message_feedback(
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<String>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<MessageRecord>, ApiError> {
    let updated = state
        .service
        .message_feedback(&message_id, payload.feedback.as_str())?;
    Ok(Json(updated))
}

/// `POST /chat`
pub async fn one_shot(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OneShotRequest>,
) -> Result<Json<OneShotReply>, ApiError> {
    if payload.top_k < 1 || payload.top_k > 20 {
        return Err(LorebookError::Validation("top_k must be within 1..=20".into()).into());
    }
    if !(0.0..=1.0).contains(&payload.temperature) {
        return Err(
            LorebookError::Validation("temperature must be within 0.0..=1.0".into()).into(),
        );
    }
    let reply = state
        .service
        .one_shot(&payload.question, payload.top_k, payload.temperature)
        .await?;
    Ok(Json(reply))
}

/// `POST /ingest`
///
/// Web ingestion is disabled; documents are ingested through the CLI.
pub async fn ingest_disabled() -> (StatusCode, Json<Value>) {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "detail": "Web ingestion is disabled. Run `lorebook ingest <paths>` on the server to rebuild the knowledge base."
        })),
    )
}
