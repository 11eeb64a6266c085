//! Configuration management for Lorebook
//!
//! This module handles loading, parsing, and validating configuration
//! from a YAML file with environment-variable fallbacks for credentials.
//! The loaded [`Config`] is immutable after startup and passed by reference
//! into the pipeline; nothing mutates process-wide state.

use crate::error::{LorebookError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Lorebook
///
/// Holds all configuration needed to serve chats: provider settings,
/// web-search settings, index and chat-store locations, and HTTP server
/// options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Generation/embedding provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Web search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Vector index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Chat store configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Provider configuration
///
/// Currently only the Gemini provider is supported; the nesting mirrors the
/// config file layout so further providers slot in alongside it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    /// Gemini configuration
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Model used for answer and title generation
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Model used for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// API key; falls back to GEMINI_API_KEY / GOOGLE_API_KEY /
    /// GEMMI_API_KEY environment variables when unset
    #[serde(default)]
    pub api_key: Option<String>,

    /// Optional API base URL override (useful for tests and local mocks)
    ///
    /// When set, this base is used to build the `generateContent` and
    /// `embedContent` endpoints, which allows tests to point the client at
    /// a mock server.
    #[serde(default)]
    pub api_base: Option<String>,
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            embedding_model: default_embedding_model(),
            api_key: None,
            api_base: None,
        }
    }
}

impl GeminiConfig {
    /// Resolve the API key from config or environment
    ///
    /// Accepts any of `GEMINI_API_KEY`, `GOOGLE_API_KEY`, or
    /// `GEMMI_API_KEY`, in that order, when the config field is unset.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .or_else(|| std::env::var("GEMMI_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }
}

/// Web search (SerpAPI) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// API key; falls back to the SERPAPI_API_KEY environment variable
    #[serde(default)]
    pub api_key: Option<String>,

    /// Search endpoint (override for tests)
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Search engine parameter
    #[serde(default = "default_search_engine")]
    pub engine: String,
}

fn default_search_endpoint() -> String {
    "https://serpapi.com/search.json".to_string()
}

fn default_search_engine() -> String {
    "google".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_search_endpoint(),
            engine: default_search_engine(),
        }
    }
}

impl SearchConfig {
    /// Resolve the API key from config or environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("SERPAPI_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory for the chunk database
    #[serde(default = "default_index_path")]
    pub path: PathBuf,

    /// Collection (sled tree) holding the chunks
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Chunk size in characters for ingestion
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Chunk overlap in characters for ingestion
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_index_path() -> PathBuf {
    data_root().join("index")
}

fn default_collection() -> String {
    "lorebook_docs".to_string()
}

fn default_chunk_size() -> usize {
    800
}

fn default_chunk_overlap() -> usize {
    120
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            collection: default_collection(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Chat store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for the chat database
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    data_root().join("chats")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; `"*"` allows any origin
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Per-application data root used for default store locations
fn data_root() -> PathBuf {
    directories::ProjectDirs::from("io", "lorebook", "lorebook")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// A missing file yields the default configuration, so the server can
    /// start from environment credentials alone.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(
                "Config file {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(LorebookError::Io)?;
        let config: Config = serde_yaml::from_str(&raw).map_err(LorebookError::Yaml)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `LorebookError::Config` when a field is out of range
    pub fn validate(&self) -> Result<()> {
        if self.provider.gemini.model.is_empty() {
            return Err(LorebookError::Config("provider.gemini.model must not be empty".into()).into());
        }
        if self.provider.gemini.embedding_model.is_empty() {
            return Err(LorebookError::Config(
                "provider.gemini.embedding_model must not be empty".into(),
            )
            .into());
        }
        if self.index.chunk_size == 0 {
            return Err(LorebookError::Config("index.chunk_size must be positive".into()).into());
        }
        if self.index.chunk_overlap >= self.index.chunk_size {
            return Err(LorebookError::Config(
                "index.chunk_overlap must be smaller than index.chunk_size".into(),
            )
            .into());
        }
        if self.server.allowed_origins.is_empty() {
            return Err(LorebookError::Config(
                "server.allowed_origins must not be empty".into(),
            )
            .into());
        }
        Ok(())
    }
}
