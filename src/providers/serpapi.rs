//! SerpAPI web-search implementation for Lorebook
//!
//! Implements the [`WebSearch`] capability against the SerpAPI Google
//! endpoint. Fails with `MissingCredentials` when no key is configured;
//! the retrieval pipeline tolerates that failure silently.

use crate::config::SearchConfig;
use crate::error::{LorebookError, Result};
use crate::providers::{Passage, WebSearch};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// SerpAPI client
///
/// # Examples
///
/// ```no_run
/// use lorebook::config::SearchConfig;
/// use lorebook::providers::{SerpApiClient, WebSearch};
///
/// # async fn example() -> lorebook::error::Result<()> {
/// let client = SerpApiClient::new(SearchConfig::default())?;
/// let passages = client.search("rust borrow checker", 5).await?;
/// # Ok(())
/// # }
/// ```
pub struct SerpApiClient {
    client: Client,
    config: SearchConfig,
}

impl SerpApiClient {
    /// Create a new SerpAPI client
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("lorebook/0.2.0")
            .build()
            .map_err(|e| LorebookError::Search(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Configured endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl WebSearch for SerpApiClient {
    async fn search(&self, query: &str, num: usize) -> Result<Vec<Passage>> {
        let key = self
            .config
            .resolve_api_key()
            .ok_or_else(|| LorebookError::MissingCredentials("serpapi".to_string()))?;

        tracing::debug!("Web search: num={}, query_chars={}", num, query.chars().count());

        let num_param = num.to_string();
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("q", query),
                ("api_key", key.as_str()),
                ("engine", self.config.engine.as_str()),
                ("num", num_param.as_str()),
            ])
            .send()
            .await
            .map_err(|e| LorebookError::Search(format!("Web search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LorebookError::Search(format!(
                "Web search returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| LorebookError::Search(format!("Failed to parse search response: {}", e)))?;

        Ok(parse_organic_results(&data, num))
    }
}

/// Extract passages from the `organic_results` list
///
/// Mirrors the snippet fallback chain of the search provider's response
/// shape: `snippet`, then `snippet_highlighted`, then the rich-snippet
/// top/bottom text blocks; link falls back through `link`, `url`, and
/// `displayed_link`.
fn parse_organic_results(data: &Value, num: usize) -> Vec<Passage> {
    let organic = data
        .get("organic_results")
        .or_else(|| data.get("organic"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    organic
        .iter()
        .take(num)
        .map(|item| {
            let link = item
                .get("link")
                .or_else(|| item.get("url"))
                .or_else(|| item.get("displayed_link"))
                .and_then(Value::as_str)
                .map(str::to_string);

            let snippet = item
                .get("snippet")
                .or_else(|| item.get("snippet_highlighted"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| rich_snippet_text(item, "top"))
                .or_else(|| rich_snippet_text(item, "bottom"))
                .unwrap_or_default();

            Passage::new(snippet, link)
        })
        .collect()
}

fn rich_snippet_text(item: &Value, section: &str) -> Option<String> {
    item.get("rich_snippet")?
        .get(section)?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    #[test]
    fn test_parse_organic_results_basic() {
        let data = json!({
            "organic_results": [
                {"title": "Rust", "link": "https://rust-lang.org", "snippet": "A language"},
                {"title": "Book", "link": "https://doc.rust-lang.org", "snippet": "The book"}
            ]
        });
        let passages = parse_organic_results(&data, 5);
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].content, "A language");
        assert_eq!(passages[0].source.as_deref(), Some("https://rust-lang.org"));
        assert!(passages[0].score.is_none());
    }

    #[test]
    fn test_parse_organic_results_respects_num() {
        let data = json!({
            "organic_results": [
                {"link": "a", "snippet": "1"},
                {"link": "b", "snippet": "2"},
                {"link": "c", "snippet": "3"}
            ]
        });
        assert_eq!(parse_organic_results(&data, 2).len(), 2);
    }

    #[test]
    fn test_parse_snippet_fallback_to_rich_snippet() {
        let data = json!({
            "organic_results": [
                {"link": "a", "rich_snippet": {"top": {"text": "from rich top"}}}
            ]
        });
        let passages = parse_organic_results(&data, 5);
        assert_eq!(passages[0].content, "from rich top");
    }

    #[test]
    fn test_parse_link_fallback_to_url() {
        let data = json!({
            "organic_results": [
                {"url": "https://fallback.example", "snippet": "s"}
            ]
        });
        let passages = parse_organic_results(&data, 5);
        assert_eq!(
            passages[0].source.as_deref(),
            Some("https://fallback.example")
        );
    }

    #[test]
    fn test_parse_missing_snippet_yields_empty_content() {
        let data = json!({
            "organic_results": [
                {"link": "a"}
            ]
        });
        let passages = parse_organic_results(&data, 5);
        assert_eq!(passages[0].content, "");
    }

    #[test]
    fn test_parse_no_organic_results() {
        let data = json!({"search_metadata": {}});
        assert!(parse_organic_results(&data, 5).is_empty());
    }

    #[test]
    fn test_parse_alternate_organic_key() {
        let data = json!({
            "organic": [
                {"link": "a", "snippet": "alt"}
            ]
        });
        let passages = parse_organic_results(&data, 5);
        assert_eq!(passages[0].content, "alt");
    }

    #[tokio::test]
    #[serial]
    async fn test_search_without_key_fails() {
        std::env::remove_var("SERPAPI_API_KEY");
        let client = SerpApiClient::new(SearchConfig::default()).unwrap();
        let result = client.search("anything", 3).await;
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LorebookError>(),
            Some(LorebookError::MissingCredentials(_))
        ));
    }
}
