//! # Session and Expiry Gate
//!
//! Sessions are anonymous: a UUID generated on the device when the attendee
//! joins an event. The joined event, the session id and an optional admin
//! flag are cached in local storage and checked at startup to decide where
//! the app opens.

use crate::client::local_db::{get_json, set_json, LocalStorage, LocalStorageError};
use crate::shared::{Event, NewProfile};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub const EVENT_ID_KEY: &str = "mingle.event_id";
pub const SESSION_ID_KEY: &str = "mingle.session_id";
pub const EVENT_SNAPSHOT_KEY: &str = "mingle.event";
pub const ADMIN_SESSION_KEY: &str = "mingle.admin_session_at";
pub const PROFILE_DRAFT_KEY: &str = "mingle.profile_draft";

/// How long an admin login stays valid
pub const ADMIN_SESSION_HOURS: i64 = 24;

/// Whether a cached session for `event` can be resumed at `now`
pub fn is_resumable(event: &Event, now: DateTime<Utc>) -> bool {
    event.is_active_at(now)
}

/// Whether an admin flag set at `set_at` is still valid at `now`
pub fn admin_session_valid(set_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= set_at && now - set_at < Duration::hours(ADMIN_SESSION_HOURS)
}

/// Fresh anonymous session identifier
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// The session cached for the last joined event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSession {
    pub event: Event,
    pub session_id: String,
}

/// Typed access to the session keys in local storage
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn LocalStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Remember `event` and the attendee's session for it
    pub async fn save_event_session(&self, event: &Event, session_id: &str) -> Result<(), LocalStorageError> {
        self.storage.set(EVENT_ID_KEY, &event.id).await?;
        self.storage.set(SESSION_ID_KEY, session_id).await?;
        set_json(self.storage.as_ref(), EVENT_SNAPSHOT_KEY, event).await
    }

    /// The cached session, if all of its keys are present and consistent
    pub async fn event_session(&self) -> Result<Option<CachedSession>, LocalStorageError> {
        let Some(event_id) = self.storage.get(EVENT_ID_KEY).await? else {
            return Ok(None);
        };
        let Some(session_id) = self.storage.get(SESSION_ID_KEY).await? else {
            return Ok(None);
        };
        let event: Option<Event> = match get_json(self.storage.as_ref(), EVENT_SNAPSHOT_KEY).await {
            Ok(event) => event,
            Err(LocalStorageError::Serialization(err)) => {
                tracing::warn!(error = %err, "discarding unreadable event snapshot");
                None
            }
            Err(err) => return Err(err),
        };

        Ok(event
            .filter(|event| event.id == event_id)
            .map(|event| CachedSession { event, session_id }))
    }

    /// Forget the joined event, its session and the profile draft
    pub async fn clear_event_session(&self) -> Result<(), LocalStorageError> {
        self.storage
            .multi_remove(&[EVENT_ID_KEY, SESSION_ID_KEY, EVENT_SNAPSHOT_KEY, PROFILE_DRAFT_KEY])
            .await
    }

    pub async fn set_admin_session(&self, at: DateTime<Utc>) -> Result<(), LocalStorageError> {
        set_json(self.storage.as_ref(), ADMIN_SESSION_KEY, &at).await
    }

    pub async fn admin_session_at(&self) -> Result<Option<DateTime<Utc>>, LocalStorageError> {
        get_json(self.storage.as_ref(), ADMIN_SESSION_KEY).await
    }

    pub async fn clear_admin_session(&self) -> Result<(), LocalStorageError> {
        self.storage.remove(ADMIN_SESSION_KEY).await
    }

    pub async fn save_profile_draft(&self, draft: &NewProfile) -> Result<(), LocalStorageError> {
        set_json(self.storage.as_ref(), PROFILE_DRAFT_KEY, draft).await
    }

    pub async fn profile_draft(&self) -> Result<Option<NewProfile>, LocalStorageError> {
        get_json(self.storage.as_ref(), PROFILE_DRAFT_KEY).await
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

/// Where the app opens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupRoute {
    /// Straight back into discovery for a live event
    ResumeDiscovery { event: Event, session_id: String },
    /// No usable session: show the join flow
    JoinEvent,
    /// The admin flag expired
    AdminReauth,
    AdminDashboard,
}

/// Startup decision over the cached session state
#[derive(Debug, Clone)]
pub struct SessionGate {
    sessions: SessionStore,
}

impl SessionGate {
    pub fn new(sessions: SessionStore) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Decide the startup route at `now`. Expired state is cleared as a side
    /// effect so the next launch starts clean.
    pub async fn resolve(&self, now: DateTime<Utc>) -> Result<StartupRoute, LocalStorageError> {
        if let Some(set_at) = self.sessions.admin_session_at().await? {
            if admin_session_valid(set_at, now) {
                return Ok(StartupRoute::AdminDashboard);
            }
            tracing::info!(%set_at, "admin session expired");
            self.sessions.clear_admin_session().await?;
            return Ok(StartupRoute::AdminReauth);
        }

        match self.sessions.event_session().await? {
            Some(cached) if is_resumable(&cached.event, now) => {
                tracing::debug!(event_id = %cached.event.id, "resuming cached session");
                Ok(StartupRoute::ResumeDiscovery {
                    event: cached.event,
                    session_id: cached.session_id,
                })
            }
            Some(cached) => {
                tracing::info!(event_id = %cached.event.id, "cached event is outside its window, forcing rejoin");
                self.sessions.clear_event_session().await?;
                Ok(StartupRoute::JoinEvent)
            }
            None => Ok(StartupRoute::JoinEvent),
        }
    }
}
