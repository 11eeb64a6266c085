//! Conversation window extraction
//!
//! Pure helpers over a chat's ordered message list: the bounded recency
//! window the rest of the pipeline works from, and the `Role: content`
//! transcript used in grounded prompts.

use crate::storage::MessageRecord;

/// Number of most-recent messages considered by the pipeline
pub const WINDOW_SIZE: usize = 10;

/// The most recent `limit` messages, in chronological order
///
/// Input must already be ordered by creation time ascending, which is the
/// chat store's listing contract. Empty input yields an empty window.
///
/// # Examples
///
/// ```
/// use lorebook::pipeline::recent_window;
/// use lorebook::storage::MessageRecord;
///
/// let messages: Vec<MessageRecord> = (0..4)
///     .map(|i| MessageRecord::user("c1", format!("m{}", i)))
///     .collect();
/// let window = recent_window(&messages, 3);
/// assert_eq!(window.len(), 3);
/// assert_eq!(window[0].content, "m1");
/// assert_eq!(window[2].content, "m3");
/// ```
pub fn recent_window(messages: &[MessageRecord], limit: usize) -> &[MessageRecord] {
    let start = messages.len().saturating_sub(limit);
    &messages[start..]
}

/// Format a window as a `Role: content` transcript, oldest to newest
///
/// Roles are capitalized ("User", "Assistant") to match the grounded
/// prompt layout.
pub fn format_transcript(window: &[MessageRecord]) -> String {
    window
        .iter()
        .map(|m| format!("{}: {}", capitalize(&m.role), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn capitalize(role: &str) -> String {
    let mut chars = role.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
