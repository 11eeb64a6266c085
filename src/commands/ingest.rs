//! Ingest command: chunk and index documents from the CLI

use crate::config::Config;
use crate::error::Result;
use crate::index::LocalVectorStore;
use crate::ingest::ingest_paths;
use crate::providers::GeminiClient;

use std::path::PathBuf;
use std::sync::Arc;

/// Ingest the given files or directories into the vector index
pub async fn run_ingest(config: Config, paths: Vec<PathBuf>) -> Result<()> {
    let embedder = Arc::new(GeminiClient::new(config.provider.gemini.clone())?);
    let store = LocalVectorStore::open(&config.index.path, &config.index.collection, embedder)?;

    let report = ingest_paths(
        &store,
        &paths,
        config.index.chunk_size,
        config.index.chunk_overlap,
    )
    .await?;

    println!(
        "Ingested {} file(s) into {} chunk(s); index now holds {} chunk(s)",
        report.files,
        report.chunks,
        store.len()
    );
    Ok(())
}
