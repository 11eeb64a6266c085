//! HTTP API server
//!
//! A thin axum layer over [`ChatService`]: route definitions, request
//! payloads, and the error-to-status mapping. No pipeline logic lives
//! here.

pub mod routes;

use crate::config::ServerConfig;
use crate::error::LorebookError;
use crate::pipeline::ChatService;

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state
pub struct AppState {
    /// The assembled chat pipeline
    pub service: ChatService,
}

/// API error wrapper mapping pipeline errors to HTTP statuses
///
/// NotFound-class errors map to 404, malformed ids and invalid payloads
/// to 400, missing credentials to 401, and everything else to 500. The
/// body shape is `{"detail": "..."}`.
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

impl From<LorebookError> for ApiError {
    fn from(err: LorebookError) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<LorebookError>() {
            Some(LorebookError::ChatNotFound(_))
            | Some(LorebookError::MessageNotFound(_))
            | Some(LorebookError::NoData(_)) => StatusCode::NOT_FOUND,
            Some(LorebookError::InvalidId(_)) | Some(LorebookError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            Some(LorebookError::MissingCredentials(_)) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {:#}", self.0);
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/chats", get(routes::list_chats).post(routes::create_chat))
        .route(
            "/chats/:chat_id",
            get(routes::get_chat).delete(routes::delete_chat),
        )
        .route("/chats/:chat_id/messages", post(routes::post_message))
        .route(
            "/chats/messages/:message_id/feedback",
            post(routes::message_feedback),
        )
        .route("/chat", post(routes::one_shot))
        .route("/ingest", post(routes::ingest_disabled))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
