//! Like Data Structure
//!
//! A directed edge `liker -> liked` inside one event. Two reciprocal edges
//! with `is_mutual` set form a match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored like
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Like {
    /// [`Like::edge_id`] for rows written by this client
    pub id: String,
    pub event_id: String,
    pub liker_session_id: String,
    pub liked_session_id: String,
    #[serde(default)]
    pub is_mutual: bool,
    /// Set on the row of the attendee whose earlier like was completed
    #[serde(default)]
    pub liker_notified_of_match: bool,
    /// Set on the row of the attendee whose like completed the match
    #[serde(default)]
    pub liked_notified_of_match: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Like {
    /// Document id of the edge `liker -> liked`. Deterministic, so a
    /// repeated create of the same edge collides instead of duplicating it.
    pub fn edge_id(event_id: &str, liker: &str, liked: &str) -> String {
        format!("{}:{}:{}", event_id, liker, liked)
    }

    /// Whether this edge goes from `liker` to `liked`
    pub fn connects(&self, liker: &str, liked: &str) -> bool {
        self.liker_session_id == liker && self.liked_session_id == liked
    }

    /// Whether `other` is the reverse edge of this one
    pub fn is_reciprocal_of(&self, other: &Like) -> bool {
        self.event_id == other.event_id
            && self.liker_session_id == other.liked_session_id
            && self.liked_session_id == other.liker_session_id
    }

    /// Whether this row carries a match notification for its own liker
    pub fn has_match_notification(&self) -> bool {
        self.is_mutual && (self.liker_notified_of_match || self.liked_notified_of_match)
    }
}

/// A like about to be written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewLike {
    pub id: String,
    pub event_id: String,
    pub liker_session_id: String,
    pub liked_session_id: String,
    pub is_mutual: bool,
    pub liker_notified_of_match: bool,
    pub liked_notified_of_match: bool,
}

impl NewLike {
    pub fn new(
        event_id: impl Into<String>,
        liker_session_id: impl Into<String>,
        liked_session_id: impl Into<String>,
    ) -> Self {
        let event_id = event_id.into();
        let liker_session_id = liker_session_id.into();
        let liked_session_id = liked_session_id.into();
        Self {
            id: Like::edge_id(&event_id, &liker_session_id, &liked_session_id),
            event_id,
            liker_session_id,
            liked_session_id,
            is_mutual: false,
            liker_notified_of_match: false,
            liked_notified_of_match: false,
        }
    }
}
