//! Error types for Lorebook
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Lorebook operations
///
/// This enum encompasses all possible errors that can occur while serving
/// chat requests: configuration loading, provider interactions, retrieval,
/// persistence, and request validation.
///
/// Only a few variants are meant to reach API callers (`ChatNotFound`,
/// `MessageNotFound`, `InvalidId`, `Validation`, `MissingCredentials`,
/// `NoData`, `Provider`); retrieval-layer failures (`Index`, `Search`) are
/// absorbed by the pipeline's fallback strategies.
#[derive(Error, Debug)]
pub enum LorebookError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generation/embedding provider errors (API calls, malformed responses)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Web search errors (API calls, malformed responses)
    #[error("Search error: {0}")]
    Search(String),

    /// Vector index errors (lookup, scoring, persistence of chunks)
    #[error("Index error: {0}")]
    Index(String),

    /// Chat/message storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Referenced chat does not exist
    #[error("Chat not found: {0}")]
    ChatNotFound(String),

    /// Referenced message does not exist
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// Malformed chat/message identifier
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    /// Request payload failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing credentials for an external capability
    #[error("Missing credentials for {0}")]
    MissingCredentials(String),

    /// Knowledge base has no documents to answer from
    #[error("No data available: {0}")]
    NoData(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Lorebook operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
