//! # Poll Scheduler
//!
//! Decides when the discovery coordinator refreshes from the store. Polling
//! is fixed-interval; nothing is pushed by the server.
//!
//! Owned by the coordinator task, so it takes `&mut self` instead of locking.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct SyncScheduler {
    /// Last poll time
    last_poll: Option<Instant>,
    /// Poll interval while online
    interval: Duration,
    /// Whether scheduler is active
    is_active: bool,
}

impl SyncScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_poll: None,
            interval,
            is_active: true,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stop(&mut self) {
        self.is_active = false;
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Check if a poll is due. Never while offline.
    pub fn should_poll(&self, online: bool) -> bool {
        if !self.is_active || !online {
            return false;
        }
        match self.last_poll {
            Some(time) => time.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Record that a poll was issued
    pub fn record_poll(&mut self) {
        self.last_poll = Some(Instant::now());
    }

    /// Get time until next poll, `None` before the first one
    pub fn time_until_next_poll(&self) -> Option<Duration> {
        let elapsed = self.last_poll?.elapsed();
        Some(self.interval.saturating_sub(elapsed))
    }
}
