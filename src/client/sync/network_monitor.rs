//! # Network Monitor
//!
//! Tracks device reachability. The retry executor consults it before every
//! attempt, and the offline manager watches it to drain the queue when
//! connectivity returns.
//!
//! Status can be pushed by the host platform (`set_online`) or sampled by a
//! background HTTP reachability check (`spawn_reachability_check`).

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Online,
    Offline,
}

/// Cloneable handle to the current network status
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    status: Arc<watch::Sender<NetworkStatus>>,
}

impl NetworkMonitor {
    pub fn new(initial: NetworkStatus) -> Self {
        let (status, _) = watch::channel(initial);
        Self {
            status: Arc::new(status),
        }
    }

    pub fn online() -> Self {
        Self::new(NetworkStatus::Online)
    }

    pub fn offline() -> Self {
        Self::new(NetworkStatus::Offline)
    }

    pub fn get_status(&self) -> NetworkStatus {
        *self.status.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.get_status() == NetworkStatus::Online
    }

    /// Update the status; subscribers are only woken on an actual change
    pub fn set_status(&self, status: NetworkStatus) {
        let changed = self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        if changed {
            tracing::info!(?status, "network status changed");
        }
    }

    pub fn set_online(&self, online: bool) {
        self.set_status(if online {
            NetworkStatus::Online
        } else {
            NetworkStatus::Offline
        });
    }

    /// Receiver woken on every status change
    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.status.subscribe()
    }

    /// Periodically request `url`; any HTTP response counts as reachable
    pub fn spawn_reachability_check(&self, url: String, interval: Duration) -> JoinHandle<()> {
        let monitor = self.clone();
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let reachable = client.head(&url).send().await.is_ok();
                tracing::trace!(%url, reachable, "connectivity check");
                monitor.set_online(reachable);
            }
        })
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::online()
    }
}
