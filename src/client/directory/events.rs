//! Event lookups. Events are created by organizers elsewhere and are
//! read-only here.

use super::Directory;
use crate::client::error::CoreError;
use crate::client::store::{Query, EVENTS};
use crate::shared::Event;
use chrono::{DateTime, Utc};

impl Directory {
    pub async fn event_by_id(&self, event_id: &str) -> Result<Option<Event>, CoreError> {
        self.get_record("event_by_id", EVENTS, event_id).await
    }

    /// Resolve a join code to an event that has not yet expired at `now`
    pub async fn event_by_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<Event>, CoreError> {
        let query = Query::new().eq("event_code", Event::normalize_code(code));
        let events: Vec<Event> = self.query_records("event_by_code", EVENTS, &query).await?;
        Ok(events.into_iter().find(|event| !event.has_expired_at(now)))
    }
}
