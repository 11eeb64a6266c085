//! Gemini provider implementation for Lorebook
//!
//! This module implements the [`TextGenerator`] and [`EmbeddingProvider`]
//! capabilities against the Gemini REST API (`generateContent` and
//! `embedContent`). Credentials are resolved at call time so the server
//! can start without a key and fail per-request with a clear error.

use crate::config::GeminiConfig;
use crate::error::{LorebookError, Result};
use crate::providers::{EmbeddingProvider, TextGenerator};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Gemini API base URL
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Gemini API client
///
/// Connects to the Gemini REST API for text generation and embeddings.
/// The `api_base` config field allows tests to point the client at a mock
/// server.
///
/// # Examples
///
/// ```no_run
/// use lorebook::config::GeminiConfig;
/// use lorebook::providers::{GeminiClient, TextGenerator};
///
/// # async fn example() -> lorebook::error::Result<()> {
/// let client = GeminiClient::new(GeminiConfig::default())?;
/// let answer = client.generate("Say hello", 0.3).await?;
/// # Ok(())
/// # }
/// ```
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

/// Request body for `generateContent`
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

/// Response body for `generateContent`
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Request body for `embedContent`
#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: EmbedContent,
}

#[derive(Debug, Serialize)]
struct EmbedContent {
    parts: Vec<Part>,
}

/// Response body for `embedContent`
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// # Arguments
    ///
    /// * `config` - Gemini configuration (models, optional key and base URL)
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent("lorebook/0.2.0")
            .build()
            .map_err(|e| LorebookError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized Gemini client: model={}, embedding_model={}",
            config.model,
            config.embedding_model
        );

        Ok(Self { client, config })
    }

    /// Configured generation model name
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Configured embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.config.embedding_model
    }

    fn api_base(&self) -> &str {
        self.config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    fn require_key(&self) -> Result<String> {
        self.config
            .resolve_api_key()
            .ok_or_else(|| LorebookError::MissingCredentials("gemini".to_string()).into())
    }

    async fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        key: &str,
        body: &Req,
    ) -> Result<Resp> {
        let response = self
            .client
            .post(url)
            .query(&[("key", key)])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Gemini request failed: {}", e);
                LorebookError::Provider(format!("Gemini request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini returned error {}: {}", status, error_text);
            return Err(LorebookError::Provider(format!(
                "Gemini returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let parsed = response.json::<Resp>().await.map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}", e);
            LorebookError::Provider(format!("Failed to parse Gemini response: {}", e))
        })?;
        Ok(parsed)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        let key = self.require_key()?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base(),
            self.config.model
        );

        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig { temperature },
        };

        tracing::debug!(
            "Gemini generateContent: model={}, temperature={}, prompt_chars={}",
            self.config.model,
            temperature,
            prompt.chars().count()
        );

        let response: GenerateResponse = self.post_json(&url, &key, &body).await?;
        let text = extract_text(&response);
        if text.is_empty() {
            return Err(LorebookError::Provider(
                "Gemini response contained no candidates".to_string(),
            )
            .into());
        }
        Ok(text)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = self.require_key()?;
        let url = format!(
            "{}/v1beta/models/{}:embedContent",
            self.api_base(),
            self.config.embedding_model
        );

        let body = EmbedRequest {
            model: format!("models/{}", self.config.embedding_model),
            content: EmbedContent {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
        };

        let response: EmbedResponse = self.post_json(&url, &key, &body).await?;
        if response.embedding.values.is_empty() {
            return Err(LorebookError::Provider(
                "Gemini returned an empty embedding".to_string(),
            )
            .into());
        }
        Ok(response.embedding.values)
    }
}

/// Join the text parts of the first candidate
fn extract_text(response: &GenerateResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}
