//! Serve command: construct capabilities and run the HTTP API
//!
//! All capability objects are built here, once, and passed into the
//! pipeline; nothing is lazily initialized behind globals.

use crate::config::Config;
use crate::error::Result;
use crate::index::LocalVectorStore;
use crate::pipeline::ChatService;
use crate::providers::{GeminiClient, SerpApiClient, TextGenerator, VectorIndex, WebSearch};
use crate::server::{router, AppState};
use crate::storage::ChatStore;

use std::sync::Arc;

/// Run the HTTP API server until shutdown
pub async fn run_serve(config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let state = Arc::new(build_state(&config)?);
    let app = router(state, &config.server);

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the application state from configuration
pub fn build_state(config: &Config) -> Result<AppState> {
    let gemini = Arc::new(GeminiClient::new(config.provider.gemini.clone())?);
    let llm: Arc<dyn TextGenerator> = gemini.clone();

    let index: Arc<dyn VectorIndex> = Arc::new(LocalVectorStore::open(
        &config.index.path,
        &config.index.collection,
        gemini,
    )?);

    let web: Arc<dyn WebSearch> = Arc::new(SerpApiClient::new(config.search.clone())?);

    let store = Arc::new(ChatStore::open(&config.storage.path)?);

    Ok(AppState {
        service: ChatService::new(store, index, web, llm),
    })
}
