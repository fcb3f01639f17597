//! Event Data Structure
//!
//! A time-boxed gathering. Every profile, like and message belongs to exactly
//! one event and becomes meaningless once the event has expired.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event created by an organizer; read-only to the core
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    /// Store-assigned ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Join token, unique among active events
    pub event_code: String,
    /// When the event opens
    pub starts_at: DateTime<Utc>,
    /// When the event and all of its data expire
    pub expires_at: DateTime<Utc>,
    /// IANA timezone the organizer scheduled the event in
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Private events are only reachable through their code
    #[serde(default)]
    pub is_private: bool,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Event {
    /// Whether `now` falls inside the event window (both ends inclusive)
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.starts_at && now <= self.expires_at
    }

    /// Whether the event has already expired at `now`
    pub fn has_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Normalized form of a join code as typed by an attendee
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_ascii_uppercase()
    }
}
