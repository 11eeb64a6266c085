//! Automatic chat titling
//!
//! Derives a short title from the conversation while the chat still
//! carries a default sentinel title. Runs the generation capability at
//! temperature 0 and post-processes the result into at most 6 words and
//! 40 characters with no trailing punctuation. Title generation failures
//! are non-fatal; the title stays unchanged.

use crate::providers::TextGenerator;
use std::sync::Arc;

/// Maximum words kept in a generated title
const MAX_TITLE_WORDS: usize = 6;

/// Maximum characters kept in a generated title
const MAX_TITLE_CHARS: usize = 40;

/// Characters stripped from the end of a sanitized title
const TRAILING_CHARS: [char; 7] = [' ', '.', ',', ':', ';', '!', '-'];

/// Sentinel titles that mark a chat as not yet auto-titled
const SENTINEL_TITLES: [&str; 2] = ["new chat", "untitled"];

/// Whether a title is still a default sentinel
///
/// Case-insensitive and trimmed; an empty title also counts.
///
/// # Examples
///
/// ```
/// use lorebook::pipeline::is_default_title;
///
/// assert!(is_default_title("New chat"));
/// assert!(is_default_title("  UNTITLED  "));
/// assert!(is_default_title(""));
/// assert!(!is_default_title("Rust ownership questions"));
/// ```
pub fn is_default_title(title: &str) -> bool {
    let normalized = title.trim().to_lowercase();
    normalized.is_empty() || SENTINEL_TITLES.contains(&normalized.as_str())
}

/// Sanitize a generated title
///
/// Collapses internal whitespace to single spaces, keeps the first 6
/// whitespace-delimited words, truncates to 40 characters (pure character
/// truncation, not word-safe), then strips trailing spaces and
/// punctuation. Idempotent: sanitizing a sanitized title is a no-op.
///
/// # Examples
///
/// ```
/// use lorebook::pipeline::sanitize_title;
///
/// assert_eq!(sanitize_title("  Rust   ownership basics.  "), "Rust ownership basics");
/// assert_eq!(sanitize_title("one two three four five six seven"), "one two three four five six");
/// ```
pub fn sanitize_title(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let limited = collapsed
        .split(' ')
        .take(MAX_TITLE_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    let truncated = if limited.chars().count() > MAX_TITLE_CHARS {
        limited.chars().take(MAX_TITLE_CHARS).collect::<String>()
    } else {
        limited
    };

    truncated.trim_end_matches(&TRAILING_CHARS[..]).to_string()
}

/// Title maintainer over the generation capability
pub struct TitleMaintainer {
    generator: Arc<dyn TextGenerator>,
}

impl TitleMaintainer {
    /// Create a new maintainer
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Propose a new title when the current one is still a sentinel
    ///
    /// # Arguments
    ///
    /// * `current_title` - The chat's current title
    /// * `conversation` - Transcript so far, or the raw message content
    ///   when no transcript exists
    ///
    /// # Returns
    ///
    /// `Some(title)` when a non-empty sanitized title was generated;
    /// `None` when the chat is already titled, generation failed, or the
    /// sanitized result was empty. The caller persists accepted titles.
    pub async fn maybe_retitle(&self, current_title: &str, conversation: &str) -> Option<String> {
        if !is_default_title(current_title) {
            return None;
        }

        let prompt = format!(
            "Provide a concise 3-6 word title summarizing the conversation so far. Return only the title text without extra punctuation.\n\nConversation:\n{}",
            conversation
        );

        // Deterministic: titles should not vary run to run
        let raw = match self.generator.generate(&prompt, 0.0).await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("Title generation failed: {}", e);
                return None;
            }
        };

        let title = sanitize_title(&raw);
        if title.is_empty() {
            None
        } else {
            Some(title)
        }
    }
}
