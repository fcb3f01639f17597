//! # Offline Support
//!
//! Keeps writes flowing when the venue's network does not.
//!
//! ## Architecture
//!
//! - **Retry Executor** (`retry.rs`): bounded retries with exponential
//!   backoff around every remote call
//! - **Operation Queue** (`queue.rs`): durable list of writes that failed for
//!   connectivity reasons, replayed when the device is back online
//! - **Optimistic UI** (`optimistic.rs`): "liked" markers shown before the
//!   write is confirmed, rolled back on failure
//!
//! [`OfflineManager`] ties the queue to the network monitor: it captures
//! connectivity failures and drains the queue a short while after
//! connectivity returns.

pub mod optimistic;
pub mod queue;
pub mod retry;

pub use optimistic::{OptimisticLikes, OptimisticState, OptimisticUpdate};
pub use queue::{
    OfflineQueue, QueueConfig, QueueReport, QueueStats, QueuedOperation, QueuedOperationExecutor,
    QueuedWrite,
};
pub use retry::{RetryExecutor, RetryPolicy, RetryStats};

use crate::client::error::CoreError;
use crate::client::sync::{NetworkMonitor, NetworkStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Coordinates the offline queue with connectivity
#[derive(Debug, Clone)]
pub struct OfflineManager {
    queue: Arc<OfflineQueue>,
    network: NetworkMonitor,
    settle_delay: Duration,
}

impl OfflineManager {
    pub fn new(queue: Arc<OfflineQueue>, network: NetworkMonitor, settle_delay: Duration) -> Self {
        Self {
            queue,
            network,
            settle_delay,
        }
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    /// Defer `write` if `err` is a connectivity failure, otherwise hand the
    /// error back to the caller
    pub async fn capture(&self, write: QueuedWrite, err: CoreError) -> Result<Uuid, CoreError> {
        if !err.is_connectivity() {
            return Err(err);
        }
        tracing::info!(operation = write.name(), error = %err, "deferring write until back online");
        Ok(self.queue.enqueue(write).await?)
    }

    pub async fn process_queue(&self, executor: &dyn QueuedOperationExecutor) -> QueueReport {
        self.queue.process_queue(&self.network, executor).await
    }

    /// Drain the queue after every offline-to-online transition, once the
    /// connection has stayed up for the settle delay
    pub fn spawn_reconnect_listener(
        &self,
        executor: Arc<dyn QueuedOperationExecutor>,
    ) -> JoinHandle<()> {
        let manager = self.clone();
        let mut status = self.network.subscribe();

        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let current = *status.borrow_and_update();
                if current != NetworkStatus::Online {
                    continue;
                }

                tokio::time::sleep(manager.settle_delay).await;
                if !manager.network.is_online() {
                    continue;
                }

                let report = manager.process_queue(executor.as_ref()).await;
                if report.ran {
                    tracing::info!(
                        succeeded = report.succeeded,
                        failed = report.failed,
                        dropped = report.dropped.len(),
                        remaining = report.remaining,
                        "processed offline queue after reconnect"
                    );
                }
            }
        })
    }
}
