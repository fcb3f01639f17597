//! Chat Message Data Structure
//!
//! Messages are only exchanged between the two sides of a match. A
//! conversation is the set of messages between an unordered pair of sessions,
//! read in creation order.

use crate::shared::error::SharedError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum message length in characters
pub const MAX_MESSAGE_LEN: usize = 2_000;

/// A stored chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Store-assigned ID
    pub id: String,
    pub event_id: String,
    #[serde(alias = "from_profile_id")]
    pub sender_session_id: String,
    #[serde(alias = "to_profile_id")]
    pub receiver_session_id: String,
    pub content: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub seen: bool,
    /// Ordering key within a conversation
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Whether the message belongs to the conversation between `a` and `b`
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.sender_session_id == a && self.receiver_session_id == b)
            || (self.sender_session_id == b && self.receiver_session_id == a)
    }

    /// Get a preview of the message (first N characters)
    pub fn preview(&self, max_len: usize) -> String {
        if self.content.chars().count() <= max_len {
            self.content.clone()
        } else {
            let mut preview: String = self.content.chars().take(max_len.saturating_sub(3)).collect();
            preview.push_str("...");
            preview
        }
    }
}

/// A message about to be sent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMessage {
    pub event_id: String,
    pub sender_session_id: String,
    pub receiver_session_id: String,
    pub content: String,
    pub is_read: bool,
    pub seen: bool,
}

impl NewMessage {
    pub fn new(
        event_id: impl Into<String>,
        sender_session_id: impl Into<String>,
        receiver_session_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            sender_session_id: sender_session_id.into(),
            receiver_session_id: receiver_session_id.into(),
            content: content.into(),
            is_read: false,
            seen: false,
        }
    }

    pub fn validate(&self) -> Result<(), SharedError> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(SharedError::validation("content", "message cannot be empty"));
        }
        if content.chars().count() > MAX_MESSAGE_LEN {
            return Err(SharedError::validation(
                "content",
                format!("message longer than {} characters", MAX_MESSAGE_LEN),
            ));
        }
        if self.sender_session_id == self.receiver_session_id {
            return Err(SharedError::validation("receiver_session_id", "cannot message yourself"));
        }
        Ok(())
    }
}
