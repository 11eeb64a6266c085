//! Record types for the chat store

use chrono::Utc;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Default title given to newly created chats
///
/// Chats still carrying a sentinel title ("New chat" or "Untitled",
/// case-insensitive) are eligible for automatic retitling after a message
/// exchange.
pub const DEFAULT_CHAT_TITLE: &str = "New chat";

/// Role string for user messages
pub const ROLE_USER: &str = "user";

/// Role string for assistant messages
pub const ROLE_ASSISTANT: &str = "assistant";

/// A persisted chat
///
/// Owned by the store; the pipeline only reads and writes fields.
/// `updated_at` is bumped on every message exchange so chats list in
/// recency order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRecord {
    /// Unique chat identifier (ULID)
    pub id: String,
    /// Chat title; starts as a sentinel until auto-titling runs
    pub title: String,
    /// Creation timestamp (RFC-3339)
    pub created_at: String,
    /// Last-activity timestamp (RFC-3339)
    pub updated_at: String,
}

impl ChatRecord {
    /// Create a new chat with the given title (or the default sentinel)
    pub fn new(title: Option<String>) -> Self {
        let now = now_rfc3339();
        Self {
            id: new_record_id(),
            title: title.unwrap_or_else(|| DEFAULT_CHAT_TITLE.to_string()),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// A frozen source snapshot attached to an assistant message
///
/// Captured at generation time; never updated if the index changes later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    /// Origin of the passage (file path or URL), when known
    pub source: Option<String>,
    /// Passage content as used for grounding
    pub content: String,
}

/// A persisted message
///
/// Immutable once created except for `feedback`/`feedback_at`. Ordered by
/// `created_at` ascending within a chat; this ordering is load-bearing for
/// conversation reconstruction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRecord {
    /// Unique message identifier (ULID)
    pub id: String,
    /// Owning chat identifier
    pub chat_id: String,
    /// Sender role ("user" or "assistant")
    pub role: String,
    /// Message content
    pub content: String,
    /// Creation timestamp (RFC-3339)
    pub created_at: String,
    /// Source snapshot for assistant messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceRef>>,
    /// User feedback ("like" or "dislike"), set at most once per action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Timestamp of the latest feedback action (RFC-3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_at: Option<String>,
}

impl MessageRecord {
    /// Create a user message
    ///
    /// # Examples
    ///
    /// ```
    /// use lorebook::storage::MessageRecord;
    ///
    /// let msg = MessageRecord::user("chat-1", "Hello!");
    /// assert_eq!(msg.role, "user");
    /// assert!(msg.sources.is_none());
    /// ```
    pub fn user(chat_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: new_record_id(),
            chat_id: chat_id.into(),
            role: ROLE_USER.to_string(),
            content: content.into(),
            created_at: now_rfc3339(),
            sources: None,
            feedback: None,
            feedback_at: None,
        }
    }

    /// Create an assistant message carrying its frozen source snapshot
    pub fn assistant(
        chat_id: impl Into<String>,
        content: impl Into<String>,
        sources: Vec<SourceRef>,
    ) -> Self {
        Self {
            id: new_record_id(),
            chat_id: chat_id.into(),
            role: ROLE_ASSISTANT.to_string(),
            content: content.into(),
            created_at: now_rfc3339(),
            sources: Some(sources),
            feedback: None,
            feedback_at: None,
        }
    }

    /// Whether this message was sent by the user
    pub fn is_user(&self) -> bool {
        self.role == ROLE_USER
    }

    /// Whether this message was sent by the assistant
    pub fn is_assistant(&self) -> bool {
        self.role == ROLE_ASSISTANT
    }
}

/// Generate a new ULID for a chat or message
///
/// ULIDs are sortable by timestamp, which keeps store scans roughly in
/// insertion order, and are more compact than UUIDs in keys.
pub fn new_record_id() -> String {
    Ulid::new().to_string()
}

/// Current UTC time as an RFC-3339 string
///
/// Used consistently for all record timestamps so ordering comparisons
/// work lexicographically.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
