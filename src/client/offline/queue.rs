//! # Operation Queue
//!
//! Holds writes that failed because the store could not be reached and
//! replays them once connectivity returns.
//!
//! ## Features
//!
//! - **Persistent Queue**: The pending list is written to local storage after
//!   every mutation, so operations survive app restarts
//! - **Bounded**: When full, the oldest operation is dropped
//! - **Per-operation Retry Cap**: Independent of the retry executor's
//!   per-call cap; exhausted operations are dropped and logged
//! - **Re-entrancy Guard**: Concurrent `process_queue` calls are no-ops
//!
//! Queued writes are descriptors captured at enqueue time. Replaying one may
//! overwrite a newer remote change; this is accepted best-effort behavior.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mingle::client::offline::queue::{OfflineQueue, QueueConfig, QueuedWrite};
//! use mingle::client::local_db::MemoryStorage;
//! use std::sync::Arc;
//!
//! # async fn example(executor: &dyn mingle::client::offline::QueuedOperationExecutor) {
//! let queue = OfflineQueue::new(Arc::new(MemoryStorage::new()), QueueConfig::default());
//! queue.initialize().await.unwrap();
//! queue.enqueue(QueuedWrite::CreateLike {
//!     event_id: "evt-1".into(),
//!     liker_session_id: "a".into(),
//!     liked_session_id: "b".into(),
//! }).await.unwrap();
//!
//! let network = mingle::client::sync::NetworkMonitor::online();
//! let report = queue.process_queue(&network, executor).await;
//! # }
//! ```

use crate::client::error::CoreError;
use crate::client::local_db::{get_json, set_json, LocalStorage, LocalStorageError};
use crate::client::sync::NetworkMonitor;
use crate::shared::config::{AppConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_QUEUE_MAX_ATTEMPTS};
use crate::shared::{NewMessage, NewProfile, ProfilePatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Local storage key holding the pending list
pub const QUEUE_STORAGE_KEY: &str = "mingle.offline_queue";

/// A deferred write
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueuedWrite {
    /// Like another attendee; replay runs match detection
    CreateLike {
        event_id: String,
        liker_session_id: String,
        liked_session_id: String,
    },
    SendMessage { message: NewMessage },
    UpsertProfile { profile: NewProfile },
    UpdateProfile { profile_id: String, patch: ProfilePatch },
    MarkConversationRead {
        event_id: String,
        reader_session_id: String,
        peer_session_id: String,
    },
}

impl QueuedWrite {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            QueuedWrite::CreateLike { .. } => "create_like",
            QueuedWrite::SendMessage { .. } => "send_message",
            QueuedWrite::UpsertProfile { .. } => "upsert_profile",
            QueuedWrite::UpdateProfile { .. } => "update_profile",
            QueuedWrite::MarkConversationRead { .. } => "mark_conversation_read",
        }
    }
}

/// Queued operation with metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueuedOperation {
    pub id: Uuid,
    pub write: QueuedWrite,
    pub queued_at: DateTime<Utc>,
    /// Failed replays so far
    pub retry_count: u32,
    #[serde(default)]
    pub last_attempt: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// Replays queued writes against the remote store
#[async_trait]
pub trait QueuedOperationExecutor: Send + Sync {
    async fn replay(&self, write: &QueuedWrite) -> Result<(), CoreError>;
}

/// Queue limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub capacity: usize,
    /// Replays allowed per operation before it is dropped
    pub max_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            max_attempts: DEFAULT_QUEUE_MAX_ATTEMPTS,
        }
    }
}

impl QueueConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            capacity: config.queue_capacity.max(1),
            max_attempts: config.queue_max_attempts.max(1),
        }
    }
}

/// Outcome of one `process_queue` pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueReport {
    /// Whether the pass ran at all
    pub ran: bool,
    pub succeeded: usize,
    /// Failed but kept for another pass
    pub failed: usize,
    /// Removed after a permanent error or exhausting the retry cap
    pub dropped: Vec<QueuedOperation>,
    pub remaining: usize,
}

/// Lifetime queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub enqueued: u64,
    pub completed: u64,
    /// Evicted to make room for newer operations
    pub dropped_overflow: u64,
    /// Given up on after failed replays
    pub dropped_failed: u64,
}

/// Durable queue of deferred writes
pub struct OfflineQueue {
    storage: Arc<dyn LocalStorage>,
    operations: RwLock<VecDeque<QueuedOperation>>,
    config: QueueConfig,
    processing: AtomicBool,
    stats: RwLock<QueueStats>,
}

/// Clears the processing flag however the pass ends
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl OfflineQueue {
    pub fn new(storage: Arc<dyn LocalStorage>, config: QueueConfig) -> Self {
        Self {
            storage,
            operations: RwLock::new(VecDeque::new()),
            config,
            processing: AtomicBool::new(false),
            stats: RwLock::new(QueueStats::default()),
        }
    }

    /// Load the persisted pending list, replacing anything in memory
    pub async fn initialize(&self) -> Result<usize, LocalStorageError> {
        let stored: Vec<QueuedOperation> = match get_json(self.storage.as_ref(), QUEUE_STORAGE_KEY).await {
            Ok(stored) => stored.unwrap_or_default(),
            Err(LocalStorageError::Serialization(err)) => {
                tracing::error!(error = %err, "discarding unreadable offline queue");
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        let mut operations = self.operations.write().await;
        *operations = stored.into_iter().collect();
        let mut evicted = 0;
        while operations.len() > self.config.capacity {
            if let Some(oldest) = operations.pop_front() {
                evicted += 1;
                tracing::warn!(
                    operation_id = %oldest.id,
                    operation = oldest.write.name(),
                    "persisted offline queue over capacity, dropping oldest operation"
                );
            }
        }
        if evicted > 0 {
            if let Err(err) = self.persist(&operations).await {
                tracing::error!(error = %err, "failed to persist trimmed offline queue");
            }
        }
        let count = operations.len();
        drop(operations);

        let mut stats = self.stats.write().await;
        stats.pending = count;
        stats.dropped_overflow += evicted;
        drop(stats);
        tracing::info!(pending = count, "offline queue loaded");
        Ok(count)
    }

    /// Append a write; evicts the oldest operation when full
    pub async fn enqueue(&self, write: QueuedWrite) -> Result<Uuid, LocalStorageError> {
        let operation = QueuedOperation {
            id: Uuid::new_v4(),
            write,
            queued_at: Utc::now(),
            retry_count: 0,
            last_attempt: None,
            last_error: None,
        };
        let id = operation.id;

        // Nothing changes in memory unless the new list reached storage.
        let mut operations = self.operations.write().await;
        let mut next = operations.clone();
        let mut evicted = Vec::new();
        while next.len() >= self.config.capacity {
            match next.pop_front() {
                Some(oldest) => evicted.push(oldest),
                None => break,
            }
        }
        let name = operation.write.name();
        next.push_back(operation);
        self.persist(&next).await?;
        *operations = next;
        let pending = operations.len();
        drop(operations);

        for oldest in &evicted {
            tracing::warn!(
                operation_id = %oldest.id,
                operation = oldest.write.name(),
                "offline queue full, dropping oldest operation"
            );
        }
        tracing::debug!(operation_id = %id, operation = name, "queued offline operation");

        let mut stats = self.stats.write().await;
        stats.enqueued += 1;
        stats.dropped_overflow += evicted.len() as u64;
        stats.pending = pending;
        Ok(id)
    }

    /// Replay every pending operation once.
    ///
    /// No-op when another pass is running or the device is offline. Stops
    /// early if connectivity drops mid-pass.
    pub async fn process_queue(
        &self,
        network: &NetworkMonitor,
        executor: &dyn QueuedOperationExecutor,
    ) -> QueueReport {
        if !network.is_online() {
            tracing::debug!("offline, not processing queue");
            return QueueReport {
                remaining: self.len().await,
                ..QueueReport::default()
            };
        }
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("queue already being processed");
            return QueueReport {
                remaining: self.len().await,
                ..QueueReport::default()
            };
        }
        let _guard = ProcessingGuard(&self.processing);

        let mut report = QueueReport {
            ran: true,
            ..QueueReport::default()
        };
        let snapshot: Vec<QueuedOperation> = self.operations.read().await.iter().cloned().collect();

        for operation in snapshot {
            if !network.is_online() {
                tracing::info!("connectivity lost while processing queue");
                break;
            }

            match executor.replay(&operation.write).await {
                Ok(()) => {
                    self.remove(operation.id).await;
                    report.succeeded += 1;
                    self.stats.write().await.completed += 1;
                    tracing::debug!(operation_id = %operation.id, operation = operation.write.name(), "replayed queued operation");
                }
                Err(err) => {
                    let retry_count = operation.retry_count + 1;
                    if err.is_permanent() || retry_count >= self.config.max_attempts {
                        tracing::error!(
                            operation_id = %operation.id,
                            operation = operation.write.name(),
                            retry_count,
                            error = %err,
                            "dropping queued operation permanently"
                        );
                        self.remove(operation.id).await;
                        self.stats.write().await.dropped_failed += 1;
                        let mut dropped = operation;
                        dropped.retry_count = retry_count;
                        dropped.last_error = Some(err.to_string());
                        report.dropped.push(dropped);
                    } else {
                        tracing::warn!(
                            operation_id = %operation.id,
                            operation = operation.write.name(),
                            retry_count,
                            error = %err,
                            "queued operation failed, keeping for next pass"
                        );
                        self.record_failure(operation.id, err.to_string()).await;
                        report.failed += 1;
                    }
                }
            }
        }

        report.remaining = self.len().await;
        report
    }

    async fn remove(&self, id: Uuid) {
        let mut operations = self.operations.write().await;
        operations.retain(|op| op.id != id);
        if let Err(err) = self.persist(&operations).await {
            tracing::error!(error = %err, "failed to persist offline queue");
        }
        self.stats.write().await.pending = operations.len();
    }

    async fn record_failure(&self, id: Uuid, error: String) {
        let mut operations = self.operations.write().await;
        if let Some(op) = operations.iter_mut().find(|op| op.id == id) {
            op.retry_count += 1;
            op.last_attempt = Some(Utc::now());
            op.last_error = Some(error);
        }
        if let Err(err) = self.persist(&operations).await {
            tracing::error!(error = %err, "failed to persist offline queue");
        }
    }

    async fn persist(&self, operations: &VecDeque<QueuedOperation>) -> Result<(), LocalStorageError> {
        set_json(self.storage.as_ref(), QUEUE_STORAGE_KEY, operations).await
    }

    /// Pending operations in replay order
    pub async fn pending(&self) -> Vec<QueuedOperation> {
        self.operations.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.operations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.operations.read().await.is_empty()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    pub async fn get_stats(&self) -> QueueStats {
        *self.stats.read().await
    }

    /// Drop everything, in memory and on disk
    pub async fn clear(&self) -> Result<(), LocalStorageError> {
        let mut operations = self.operations.write().await;
        operations.clear();
        self.storage.remove(QUEUE_STORAGE_KEY).await?;
        self.stats.write().await.pending = 0;
        Ok(())
    }
}

impl std::fmt::Debug for OfflineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue")
            .field("config", &self.config)
            .field("processing", &self.is_processing())
            .finish_non_exhaustive()
    }
}
