//! Chat and message persistence
//!
//! Stores chats and their messages in an embedded `sled` database as JSON
//! documents. Messages are keyed under a `chat_id:message_id` prefix so a
//! prefix scan yields a chat's messages in roughly insertion order; the
//! load path still sorts by creation time, which is the ordering contract
//! callers rely on.

pub mod types;

pub use types::{
    new_record_id, now_rfc3339, ChatRecord, MessageRecord, SourceRef, DEFAULT_CHAT_TITLE,
    ROLE_ASSISTANT, ROLE_USER,
};

use crate::error::{LorebookError, Result};
use sled::{Db, Tree};
use std::path::Path;

/// Separator between chat id and message id in message keys
///
/// ULIDs are Crockford base32 and never contain `:`, so the prefix scan
/// for one chat cannot collide with another.
const KEY_SEPARATOR: char = ':';

/// Document store for chats and messages
///
/// # Examples
///
/// ```no_run
/// use lorebook::storage::ChatStore;
///
/// # fn main() -> lorebook::error::Result<()> {
/// let store = ChatStore::open("/tmp/lorebook-chats")?;
/// let chat = store.create_chat(None)?;
/// assert_eq!(chat.title, "New chat");
/// # Ok(())
/// # }
/// ```
pub struct ChatStore {
    db: Db,
    chats: Tree,
    messages: Tree,
    message_chats: Tree,
}

impl ChatStore {
    /// Open or create a chat store at the given path
    ///
    /// # Errors
    ///
    /// Returns `LorebookError::Storage` if the database cannot be opened
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| LorebookError::Storage(format!("Failed to open database: {}", e)))?;
        let chats = db
            .open_tree("chats")
            .map_err(|e| LorebookError::Storage(format!("Failed to open chats tree: {}", e)))?;
        let messages = db
            .open_tree("messages")
            .map_err(|e| LorebookError::Storage(format!("Failed to open messages tree: {}", e)))?;
        let message_chats = db.open_tree("message_chats").map_err(|e| {
            LorebookError::Storage(format!("Failed to open message index tree: {}", e))
        })?;
        Ok(Self {
            db,
            chats,
            messages,
            message_chats,
        })
    }

    /// Create and persist a new chat
    pub fn create_chat(&self, title: Option<String>) -> Result<ChatRecord> {
        let chat = ChatRecord::new(title);
        self.put_chat(&chat)?;
        self.flush()?;
        Ok(chat)
    }

    /// Fetch a chat by id
    pub fn chat(&self, id: &str) -> Result<Option<ChatRecord>> {
        match self
            .chats
            .get(id.as_bytes())
            .map_err(|e| LorebookError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let chat = serde_json::from_slice(&bytes)
                    .map_err(|e| LorebookError::Storage(format!("Deserialization failed: {}", e)))?;
                Ok(Some(chat))
            }
            None => Ok(None),
        }
    }

    /// List all chats, most recently updated first
    pub fn list_chats(&self) -> Result<Vec<ChatRecord>> {
        let mut chats = Vec::new();
        for entry in self.chats.iter() {
            let (_, value) =
                entry.map_err(|e| LorebookError::Storage(format!("Iteration failed: {}", e)))?;
            let chat: ChatRecord = serde_json::from_slice(&value)
                .map_err(|e| LorebookError::Storage(format!("Deserialization failed: {}", e)))?;
            chats.push(chat);
        }
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(chats)
    }

    /// Replace a chat's title
    pub fn set_chat_title(&self, id: &str, title: &str) -> Result<()> {
        let mut chat = self
            .chat(id)?
            .ok_or_else(|| LorebookError::ChatNotFound(id.to_string()))?;
        chat.title = title.to_string();
        self.put_chat(&chat)?;
        self.flush()
    }

    /// Bump a chat's `updated_at` to now
    pub fn touch_chat(&self, id: &str) -> Result<()> {
        let mut chat = self
            .chat(id)?
            .ok_or_else(|| LorebookError::ChatNotFound(id.to_string()))?;
        chat.updated_at = now_rfc3339();
        self.put_chat(&chat)?;
        self.flush()
    }

    /// Delete a chat and all of its messages
    ///
    /// Deleting a nonexistent chat is a no-op, mirroring document-store
    /// delete semantics.
    pub fn delete_chat(&self, id: &str) -> Result<()> {
        self.chats
            .remove(id.as_bytes())
            .map_err(|e| LorebookError::Storage(format!("Remove failed: {}", e)))?;

        let prefix = format!("{}{}", id, KEY_SEPARATOR);
        let mut message_keys = Vec::new();
        for entry in self.messages.scan_prefix(prefix.as_bytes()) {
            let (key, value) =
                entry.map_err(|e| LorebookError::Storage(format!("Iteration failed: {}", e)))?;
            let record: MessageRecord = serde_json::from_slice(&value)
                .map_err(|e| LorebookError::Storage(format!("Deserialization failed: {}", e)))?;
            message_keys.push((key, record.id));
        }
        for (key, message_id) in message_keys {
            self.messages
                .remove(key)
                .map_err(|e| LorebookError::Storage(format!("Remove failed: {}", e)))?;
            self.message_chats
                .remove(message_id.as_bytes())
                .map_err(|e| LorebookError::Storage(format!("Remove failed: {}", e)))?;
        }
        self.flush()
    }

    /// Append a message to its chat
    pub fn append_message(&self, message: &MessageRecord) -> Result<()> {
        let key = message_key(&message.chat_id, &message.id);
        let value = serde_json::to_vec(message)
            .map_err(|e| LorebookError::Storage(format!("Serialization failed: {}", e)))?;
        self.messages
            .insert(key.as_bytes(), value)
            .map_err(|e| LorebookError::Storage(format!("Insert failed: {}", e)))?;
        self.message_chats
            .insert(message.id.as_bytes(), message.chat_id.as_bytes())
            .map_err(|e| LorebookError::Storage(format!("Insert failed: {}", e)))?;
        self.flush()
    }

    /// All messages for a chat, ordered by creation time ascending
    pub fn messages(&self, chat_id: &str) -> Result<Vec<MessageRecord>> {
        let prefix = format!("{}{}", chat_id, KEY_SEPARATOR);
        let mut records = Vec::new();
        for entry in self.messages.scan_prefix(prefix.as_bytes()) {
            let (_, value) =
                entry.map_err(|e| LorebookError::Storage(format!("Iteration failed: {}", e)))?;
            let record: MessageRecord = serde_json::from_slice(&value)
                .map_err(|e| LorebookError::Storage(format!("Deserialization failed: {}", e)))?;
            records.push(record);
        }
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }

    /// Fetch a message by its id alone
    pub fn message(&self, message_id: &str) -> Result<Option<MessageRecord>> {
        let chat_id = match self
            .message_chats
            .get(message_id.as_bytes())
            .map_err(|e| LorebookError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => String::from_utf8_lossy(&bytes).to_string(),
            None => return Ok(None),
        };

        let key = message_key(&chat_id, message_id);
        match self
            .messages
            .get(key.as_bytes())
            .map_err(|e| LorebookError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .map_err(|e| LorebookError::Storage(format!("Deserialization failed: {}", e)))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Set feedback on a message, returning the updated record
    ///
    /// Feedback is overwritable; `feedback_at` is bumped on every action.
    /// Returns `None` when the message does not exist.
    pub fn set_feedback(&self, message_id: &str, feedback: &str) -> Result<Option<MessageRecord>> {
        let mut record = match self.message(message_id)? {
            Some(r) => r,
            None => return Ok(None),
        };
        record.feedback = Some(feedback.to_string());
        record.feedback_at = Some(now_rfc3339());

        let key = message_key(&record.chat_id, &record.id);
        let value = serde_json::to_vec(&record)
            .map_err(|e| LorebookError::Storage(format!("Serialization failed: {}", e)))?;
        self.messages
            .insert(key.as_bytes(), value)
            .map_err(|e| LorebookError::Storage(format!("Insert failed: {}", e)))?;
        self.flush()?;
        Ok(Some(record))
    }

    fn put_chat(&self, chat: &ChatRecord) -> Result<()> {
        let value = serde_json::to_vec(chat)
            .map_err(|e| LorebookError::Storage(format!("Serialization failed: {}", e)))?;
        self.chats
            .insert(chat.id.as_bytes(), value)
            .map_err(|e| LorebookError::Storage(format!("Insert failed: {}", e)))?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| LorebookError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

fn message_key(chat_id: &str, message_id: &str) -> String {
    format!("{}{}{}", chat_id, KEY_SEPARATOR, message_id)
}
