//! Match-only chat.

use super::Directory;
use crate::client::error::CoreError;
use crate::client::store::{Direction, Query, MESSAGES};
use crate::shared::{Message, NewMessage, SharedError};
use futures_util::future::try_join;
use serde_json::json;

impl Directory {
    /// Send a message to a matched attendee
    pub async fn send_message(&self, message: &NewMessage) -> Result<Message, CoreError> {
        message.validate()?;

        if !self
            .is_matched(
                &message.event_id,
                &message.sender_session_id,
                &message.receiver_session_id,
            )
            .await?
        {
            return Err(SharedError::conflict("messages can only be sent to a match").into());
        }

        self.create_record("send_message", MESSAGES, message).await
    }

    /// Whether either edge between `a` and `b` is flagged mutual
    pub async fn is_matched(&self, event_id: &str, a: &str, b: &str) -> Result<bool, CoreError> {
        if let Some(like) = self.find_like(event_id, a, b).await? {
            if like.is_mutual {
                return Ok(true);
            }
        }
        Ok(self
            .find_like(event_id, b, a)
            .await?
            .is_some_and(|like| like.is_mutual))
    }

    /// Every message between `a` and `b`, oldest first
    pub async fn conversation(&self, event_id: &str, a: &str, b: &str) -> Result<Vec<Message>, CoreError> {
        let (outgoing, incoming) = try_join(
            self.messages_between("conversation", event_id, a, b),
            self.messages_between("conversation", event_id, b, a),
        )
        .await?;

        let mut messages: Vec<Message> = outgoing.into_iter().chain(incoming).collect();
        messages.sort_by(|x, y| x.created_at.cmp(&y.created_at).then_with(|| x.id.cmp(&y.id)));
        Ok(messages)
    }

    /// Mark everything `peer` sent to `reader` as read. Returns the number
    /// of messages flipped.
    pub async fn mark_conversation_read(
        &self,
        event_id: &str,
        reader: &str,
        peer: &str,
    ) -> Result<usize, CoreError> {
        let unread: Vec<Message> = self
            .messages_between("mark_conversation_read", event_id, peer, reader)
            .await?
            .into_iter()
            .filter(|message| !message.is_read)
            .collect();
        if unread.is_empty() {
            return Ok(0);
        }

        let updates = unread
            .iter()
            .map(|message| (message.id.clone(), json!({ "is_read": true, "seen": true })))
            .collect();
        let written: Vec<Message> = self
            .batch_update_records("mark_conversation_read", MESSAGES, updates)
            .await?;
        tracing::debug!(event_id, reader, peer, count = written.len(), "marked conversation read");
        Ok(written.len())
    }

    /// Unread messages addressed to `session` across the event
    pub async fn unread_count(&self, event_id: &str, session: &str) -> Result<usize, CoreError> {
        let query = Query::new()
            .eq("event_id", event_id)
            .eq("receiver_session_id", session)
            .eq("is_read", false);
        let unread: Vec<Message> = self.query_records("unread_count", MESSAGES, &query).await?;
        Ok(unread.len())
    }

    async fn messages_between(
        &self,
        name: &str,
        event_id: &str,
        sender: &str,
        receiver: &str,
    ) -> Result<Vec<Message>, CoreError> {
        let query = Query::new()
            .eq("event_id", event_id)
            .eq("sender_session_id", sender)
            .eq("receiver_session_id", receiver)
            .order_by("created_at", Direction::Asc);
        self.query_records(name, MESSAGES, &query).await
    }
}
