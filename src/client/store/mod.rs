//! # Remote Document Store
//!
//! The boundary between the core and the external document database. The
//! database itself is a black box; the core only needs per-collection create,
//! equality-filtered queries with an optional ordering field, get, partial
//! update, delete, and an all-or-nothing batch update.
//!
//! Every failure crosses this boundary as a [`StoreError`] carrying a
//! structured [`StoreErrorKind`]. Retry policy keys off the kind, never off
//! the message text.
//!
//! ## Implementations
//!
//! - `memory.rs`: in-process store with fault injection
//! - `rest.rs`: JSON-over-HTTP adapter built on `reqwest`

pub mod memory;
pub mod rest;

pub use memory::{MemoryStore, StoreOp};
pub use rest::RestStore;

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

/// Event records
pub const EVENTS: &str = "events";
/// Attendee profiles
pub const PROFILES: &str = "event_profiles";
/// Directed likes
pub const LIKES: &str = "likes";
/// Chat messages
pub const MESSAGES: &str = "messages";

/// Structured failure category reported by a store adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Device offline or store unreachable
    Connectivity,
    /// Store reachable but temporarily refusing work
    Unavailable,
    /// Request did not complete in time
    Timeout,
    /// Store-side fault
    Internal,
    PermissionDenied,
    NotFound,
    Unauthenticated,
    /// Request rejected as malformed
    Validation,
    /// Write raced with another write
    Conflict,
}

impl StoreErrorKind {
    /// Whether retrying the same call can succeed
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            StoreErrorKind::Connectivity
                | StoreErrorKind::Unavailable
                | StoreErrorKind::Timeout
                | StoreErrorKind::Internal
        )
    }

    /// Whether the failure means the store could not be reached at all.
    /// Writes failing this way are deferred to the offline queue.
    pub fn is_connectivity(self) -> bool {
        matches!(
            self,
            StoreErrorKind::Connectivity | StoreErrorKind::Unavailable | StoreErrorKind::Timeout
        )
    }
}

/// Error returned by every [`DocumentStore`] call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Connectivity, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::NotFound, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    pub fn is_connectivity(&self) -> bool {
        self.kind.is_connectivity()
    }
}

/// Sort direction for ordered queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// Equality predicates plus an optional ordering field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `field == value` predicate
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Whether `doc` satisfies every predicate
    pub fn matches(&self, doc: &Value) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }

    /// Sort `docs` by the ordering field, keeping insertion order on ties
    pub fn sort(&self, docs: &mut [Value]) {
        if let Some((field, direction)) = &self.order_by {
            docs.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }
    }
}

/// Orders field values, treating RFC 3339 strings as instants
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                chrono::DateTime::parse_from_rfc3339(x),
                chrono::DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

/// A document-oriented remote store.
///
/// `create` assigns `id`, `created_at` and `updated_at`; `update` merges the
/// top-level fields of `patch` into the stored document and bumps
/// `updated_at`. `batch_update` applies all patches or none.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, collection: &str, doc: Value) -> Result<Value, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError>;

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Value, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn batch_update(
        &self,
        collection: &str,
        updates: Vec<(String, Value)>,
    ) -> Result<Vec<Value>, StoreError>;
}
