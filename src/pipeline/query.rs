//! Retrieval query composition
//!
//! Builds the single similarity-search query for a new message: recent
//! user intent first, assistant context to disambiguate follow-ups
//! ("tell me more"), and the new message always last so it carries the
//! most weight in similarity scoring.

use crate::storage::MessageRecord;

/// How many trailing user messages from the window join the query
pub const USER_TAIL: usize = 3;

/// How many trailing assistant messages from the window join the query
pub const ASSISTANT_TAIL: usize = 2;

/// Compose the retrieval query from the window and the new message
///
/// The query is `join(last 3 user contents)` (if any), then
/// `join(last 2 assistant contents)` (if any), then the new message,
/// space-joined in that fixed order. Absent role classes do not insert
/// empty segments. Deterministic: same window and message, same query.
///
/// # Examples
///
/// ```
/// use lorebook::pipeline::compose_query;
///
/// assert_eq!(compose_query(&[], "what is sled?"), "what is sled?");
/// ```
pub fn compose_query(window: &[MessageRecord], new_message: &str) -> String {
    let user_tail = role_tail(window, true, USER_TAIL);
    let assistant_tail = role_tail(window, false, ASSISTANT_TAIL);

    let mut parts = Vec::new();
    if !user_tail.is_empty() {
        parts.push(user_tail.join(" "));
    }
    if !assistant_tail.is_empty() {
        parts.push(assistant_tail.join(" "));
    }
    parts.push(new_message.to_string());
    parts.join(" ")
}

/// Last `limit` contents for one role class, in chronological order
fn role_tail(window: &[MessageRecord], user: bool, limit: usize) -> Vec<&str> {
    let matching: Vec<&str> = window
        .iter()
        .filter(|m| m.is_user() == user)
        .map(|m| m.content.as_str())
        .collect();
    let start = matching.len().saturating_sub(limit);
    matching[start..].to_vec()
}
