//! # Optimistic UI Updates
//!
//! "Liked" markers are shown as soon as the attendee taps like, before the
//! write is confirmed. A marker is confirmed when the write lands, kept when
//! the write is deferred to the offline queue, and rolled back when the write
//! fails for good.
//!
//! Owned by the discovery coordinator task, so no locking is needed.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Lifecycle of an optimistic marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimisticState {
    /// Write in flight
    Pending,
    /// Write deferred to the offline queue
    Queued,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimisticUpdate {
    pub target_session_id: String,
    pub applied_at: DateTime<Utc>,
    pub state: OptimisticState,
}

/// Unconfirmed "liked" markers, keyed by target session
#[derive(Debug, Clone, Default)]
pub struct OptimisticLikes {
    updates: HashMap<String, OptimisticUpdate>,
}

impl OptimisticLikes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `target` as liked. Returns false if a marker already exists.
    pub fn apply(&mut self, target: &str) -> bool {
        if self.updates.contains_key(target) {
            return false;
        }
        self.updates.insert(
            target.to_string(),
            OptimisticUpdate {
                target_session_id: target.to_string(),
                applied_at: Utc::now(),
                state: OptimisticState::Pending,
            },
        );
        true
    }

    /// The write landed; the confirmed like list now carries it
    pub fn confirm(&mut self, target: &str) -> Option<OptimisticUpdate> {
        self.updates.remove(target)
    }

    /// The write was deferred; keep showing the marker
    pub fn mark_queued(&mut self, target: &str) {
        if let Some(update) = self.updates.get_mut(target) {
            update.state = OptimisticState::Queued;
        }
    }

    /// The write failed; remove the marker
    pub fn rollback(&mut self, target: &str) -> Option<OptimisticUpdate> {
        let removed = self.updates.remove(target);
        if removed.is_some() {
            tracing::debug!(target_session = target, "rolled back optimistic like");
        }
        removed
    }

    /// Drop queued markers whose like is now confirmed by the store
    pub fn retain_unconfirmed<'a>(&mut self, confirmed: impl IntoIterator<Item = &'a str>) {
        for target in confirmed {
            if matches!(
                self.updates.get(target).map(|u| u.state),
                Some(OptimisticState::Queued)
            ) {
                self.updates.remove(target);
            }
        }
    }

    pub fn contains(&self, target: &str) -> bool {
        self.updates.contains_key(target)
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.updates.keys().map(String::as_str)
    }

    pub fn get_pending_updates(&self) -> Vec<OptimisticUpdate> {
        self.updates.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}
