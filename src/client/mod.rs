//! # Client Core
//!
//! Everything the attendee's device runs below the UI: remote store access
//! with retries, the durable offline queue, discovery filtering, match
//! detection, the startup session gate and the polling coordinator.
//!
//! [`MingleClient`] is the facade UI code talks to. Its write operations
//! either apply immediately or, when the store is unreachable after retries,
//! land in the offline queue and report [`WriteOutcome::Queued`].

pub mod config;
pub mod directory;
pub mod discovery;
pub mod error;
pub mod local_db;
pub mod offline;
pub mod session;
pub mod store;
pub mod sync;

pub use config::Config;
pub use directory::Directory;
pub use discovery::{DiscoveryFilters, GenderFilter, LikeOutcome, MatchDetector};
pub use error::CoreError;
pub use offline::{OfflineManager, OfflineQueue, QueueConfig, QueueReport, QueuedWrite, RetryExecutor, RetryPolicy};
pub use session::{SessionGate, SessionStore, StartupRoute};
pub use store::{DocumentStore, StoreError, StoreErrorKind};
pub use sync::{NetworkMonitor, NetworkStatus};

use crate::client::local_db::{LocalStorage, LocalStorageError};
use crate::client::offline::QueuedOperationExecutor;
use crate::client::session::CachedSession;
use crate::shared::{Event, Like, Message, NewMessage, NewProfile, Profile, ProfilePatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Result of a write that may have been deferred
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome<T> {
    /// The store accepted the write
    Applied(T),
    /// The store was unreachable; the write is in the offline queue
    Queued(Uuid),
}

impl<T> WriteOutcome<T> {
    pub fn is_queued(&self) -> bool {
        matches!(self, WriteOutcome::Queued(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            WriteOutcome::Applied(value) => Some(value),
            WriteOutcome::Queued(_) => None,
        }
    }
}

/// Facade over the data-access and matching core
#[derive(Debug)]
pub struct MingleClient {
    directory: Arc<Directory>,
    matcher: MatchDetector,
    offline: OfflineManager,
    sessions: SessionStore,
}

impl MingleClient {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn LocalStorage>,
        network: NetworkMonitor,
        config: &Config,
    ) -> Self {
        let app = config.app();
        let retry = RetryExecutor::new(RetryPolicy::from_config(app), network.clone());
        let directory = Arc::new(Directory::new(store, retry));
        let queue = Arc::new(OfflineQueue::new(storage.clone(), QueueConfig::from_config(app)));

        Self {
            matcher: MatchDetector::new(directory.clone()),
            directory,
            offline: OfflineManager::new(queue, network, app.settle_delay),
            sessions: SessionStore::new(storage),
        }
    }

    /// Load the persisted offline queue. Returns the number of pending writes.
    pub async fn initialize(&self) -> Result<usize, LocalStorageError> {
        let pending = self.offline.queue().initialize().await?;
        tracing::info!(pending, "client initialized");
        Ok(pending)
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn matcher(&self) -> &MatchDetector {
        &self.matcher
    }

    pub fn offline(&self) -> &OfflineManager {
        &self.offline
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn network(&self) -> &NetworkMonitor {
        self.offline.network()
    }

    /// Look up an active event by code and start a fresh anonymous session
    /// in it. `None` if no event with that code is live at `now`.
    pub async fn join_event(&self, code: &str, now: DateTime<Utc>) -> Result<Option<CachedSession>, CoreError> {
        let Some(event) = self.directory.event_by_code(code, now).await? else {
            return Ok(None);
        };
        if !session::is_resumable(&event, now) {
            tracing::info!(event_id = %event.id, "event has not started yet");
            return Ok(None);
        }

        let session_id = session::new_session_id();
        self.sessions.save_event_session(&event, &session_id).await?;
        tracing::info!(event_id = %event.id, "joined event");
        Ok(Some(CachedSession { event, session_id }))
    }

    /// Candidate pool for `me` among the event's visible profiles
    pub async fn candidates(&self, me: &Profile, filters: &DiscoveryFilters) -> Result<Vec<Profile>, CoreError> {
        let visible = self.directory.visible_profiles(&me.event_id).await?;
        Ok(discovery::candidate_pool(me, &visible, filters))
    }

    pub async fn like(
        &self,
        event: &Event,
        liker: &str,
        liked: &str,
        known: &[Like],
    ) -> Result<WriteOutcome<LikeOutcome>, CoreError> {
        match self.matcher.like(&event.id, liker, liked, known).await {
            Ok(outcome) => Ok(WriteOutcome::Applied(outcome)),
            Err(err) => {
                let write = QueuedWrite::CreateLike {
                    event_id: event.id.clone(),
                    liker_session_id: liker.to_string(),
                    liked_session_id: liked.to_string(),
                };
                self.defer(write, err).await
            }
        }
    }

    pub async fn send_message(&self, message: &NewMessage) -> Result<WriteOutcome<Message>, CoreError> {
        match self.directory.send_message(message).await {
            Ok(sent) => Ok(WriteOutcome::Applied(sent)),
            Err(err) => {
                let write = QueuedWrite::SendMessage {
                    message: message.clone(),
                };
                self.defer(write, err).await
            }
        }
    }

    pub async fn upsert_profile(&self, profile: &NewProfile) -> Result<WriteOutcome<Profile>, CoreError> {
        match self.directory.upsert_profile(profile).await {
            Ok(saved) => Ok(WriteOutcome::Applied(saved)),
            Err(err) => {
                let write = QueuedWrite::UpsertProfile {
                    profile: profile.clone(),
                };
                self.defer(write, err).await
            }
        }
    }

    pub async fn update_profile(
        &self,
        profile_id: &str,
        patch: &ProfilePatch,
    ) -> Result<WriteOutcome<Profile>, CoreError> {
        match self.directory.update_profile(profile_id, patch).await {
            Ok(saved) => Ok(WriteOutcome::Applied(saved)),
            Err(err) => {
                let write = QueuedWrite::UpdateProfile {
                    profile_id: profile_id.to_string(),
                    patch: patch.clone(),
                };
                self.defer(write, err).await
            }
        }
    }

    pub async fn mark_conversation_read(
        &self,
        event_id: &str,
        reader: &str,
        peer: &str,
    ) -> Result<WriteOutcome<usize>, CoreError> {
        match self.directory.mark_conversation_read(event_id, reader, peer).await {
            Ok(count) => Ok(WriteOutcome::Applied(count)),
            Err(err) => {
                let write = QueuedWrite::MarkConversationRead {
                    event_id: event_id.to_string(),
                    reader_session_id: reader.to_string(),
                    peer_session_id: peer.to_string(),
                };
                self.defer(write, err).await
            }
        }
    }

    async fn defer<T>(&self, write: QueuedWrite, err: CoreError) -> Result<WriteOutcome<T>, CoreError> {
        self.offline.capture(write, err).await.map(WriteOutcome::Queued)
    }

    /// Replay the offline queue once
    pub async fn process_queue(&self) -> QueueReport {
        self.offline.process_queue(self).await
    }

    /// Replay the offline queue whenever connectivity returns
    pub fn spawn_reconnect_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let executor: Arc<dyn QueuedOperationExecutor> = self.clone();
        self.offline.spawn_reconnect_listener(executor)
    }
}

#[async_trait]
impl QueuedOperationExecutor for MingleClient {
    async fn replay(&self, write: &QueuedWrite) -> Result<(), CoreError> {
        match write {
            QueuedWrite::CreateLike {
                event_id,
                liker_session_id,
                liked_session_id,
            } => {
                self.matcher
                    .like(event_id, liker_session_id, liked_session_id, &[])
                    .await?;
            }
            QueuedWrite::SendMessage { message } => {
                self.directory.send_message(message).await?;
            }
            QueuedWrite::UpsertProfile { profile } => {
                self.directory.upsert_profile(profile).await?;
            }
            QueuedWrite::UpdateProfile { profile_id, patch } => {
                self.directory.update_profile(profile_id, patch).await?;
            }
            QueuedWrite::MarkConversationRead {
                event_id,
                reader_session_id,
                peer_session_id,
            } => {
                self.directory
                    .mark_conversation_read(event_id, reader_session_id, peer_session_id)
                    .await?;
            }
        }
        Ok(())
    }
}
