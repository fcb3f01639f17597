//! # Profile Directory Access
//!
//! Typed accessors for the event-scoped collections, built atop the
//! [`RetryExecutor`]. Every remote call made by the core goes through here.
//!
//! ## Key Components
//!
//! - `events.rs`: event lookup by id and join code
//! - `profiles.rs`: profile upsert, partial update, visibility listing
//! - `likes.rs`: like edges and the atomic mutual flip
//! - `messages.rs`: match-only chat, conversation ordering, read receipts

pub mod events;
pub mod likes;
pub mod messages;
pub mod profiles;

use crate::client::error::CoreError;
use crate::client::offline::RetryExecutor;
use crate::client::store::{DocumentStore, Query, StoreErrorKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Retrying, typed view of the remote document store
#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn DocumentStore>,
    retry: RetryExecutor,
}

impl Directory {
    pub fn new(store: Arc<dyn DocumentStore>, retry: RetryExecutor) -> Self {
        Self { store, retry }
    }

    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    async fn create_record<N, T>(&self, name: &str, collection: &str, record: &N) -> Result<T, CoreError>
    where
        N: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let doc = serde_json::to_value(record)?;
        let store = &self.store;
        let created = self
            .retry
            .execute(name, move || store.create(collection, doc.clone()))
            .await?;
        Ok(serde_json::from_value(created)?)
    }

    /// Create under a caller-chosen id. A conflict on that id means an
    /// earlier attempt already landed, so the stored row is returned.
    async fn create_record_once<N, T>(
        &self,
        name: &str,
        collection: &str,
        id: &str,
        record: &N,
    ) -> Result<T, CoreError>
    where
        N: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        match self.create_record(name, collection, record).await {
            Err(CoreError::Store(err)) if err.kind == StoreErrorKind::Conflict => {
                match self.get_record(name, collection, id).await? {
                    Some(existing) => {
                        tracing::debug!(operation = name, id, "create already applied, reusing stored row");
                        Ok(existing)
                    }
                    None => Err(CoreError::Store(err)),
                }
            }
            other => other,
        }
    }

    async fn get_record<T>(&self, name: &str, collection: &str, id: &str) -> Result<Option<T>, CoreError>
    where
        T: DeserializeOwned,
    {
        let store = &self.store;
        let found = self
            .retry
            .execute(name, move || store.get(collection, id))
            .await?;
        match found {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    async fn query_records<T>(&self, name: &str, collection: &str, query: &Query) -> Result<Vec<T>, CoreError>
    where
        T: DeserializeOwned,
    {
        decode_all(self.query_docs(name, collection, query).await?)
    }

    async fn query_docs(&self, name: &str, collection: &str, query: &Query) -> Result<Vec<Value>, CoreError> {
        let store = &self.store;
        Ok(self
            .retry
            .execute(name, move || store.query(collection, query))
            .await?)
    }

    async fn update_record<T>(&self, name: &str, collection: &str, id: &str, patch: Value) -> Result<T, CoreError>
    where
        T: DeserializeOwned,
    {
        let store = &self.store;
        let updated = self
            .retry
            .execute(name, move || store.update(collection, id, patch.clone()))
            .await?;
        Ok(serde_json::from_value(updated)?)
    }

    async fn batch_update_records<T>(
        &self,
        name: &str,
        collection: &str,
        updates: Vec<(String, Value)>,
    ) -> Result<Vec<T>, CoreError>
    where
        T: DeserializeOwned,
    {
        decode_all(self.batch_update_docs(name, collection, updates).await?)
    }

    async fn batch_update_docs(
        &self,
        name: &str,
        collection: &str,
        updates: Vec<(String, Value)>,
    ) -> Result<Vec<Value>, CoreError> {
        let store = &self.store;
        Ok(self
            .retry
            .execute(name, move || store.batch_update(collection, updates.clone()))
            .await?)
    }

    async fn delete_record(&self, name: &str, collection: &str, id: &str) -> Result<(), CoreError> {
        let store = &self.store;
        self.retry
            .execute(name, move || store.delete(collection, id))
            .await?;
        Ok(())
    }
}

fn decode_all<T: DeserializeOwned>(docs: Vec<Value>) -> Result<Vec<T>, CoreError> {
    docs.into_iter()
        .map(|doc| serde_json::from_value(doc).map_err(CoreError::from))
        .collect()
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::client::offline::RetryPolicy;
    use crate::client::store::MemoryStore;
    use crate::client::sync::NetworkMonitor;
    use crate::shared::{GenderIdentity, InterestedIn, NewProfile};
    use serde_json::json;
    use std::time::Duration;

    /// Directory over a fresh memory store with a fast, jitter-free policy
    pub fn directory() -> (Directory, Arc<MemoryStore>, NetworkMonitor) {
        let store = Arc::new(MemoryStore::new());
        let network = NetworkMonitor::online();
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(10),
            max_jitter: Duration::ZERO,
        };
        let directory = Directory::new(store.clone(), RetryExecutor::new(policy, network.clone()));
        (directory, store, network)
    }

    pub fn attendee(session: &str) -> NewProfile {
        NewProfile {
            event_id: "evt".to_string(),
            session_id: session.to_string(),
            first_name: session.to_uppercase(),
            age: 30,
            gender_identity: GenderIdentity::Woman,
            interested_in: InterestedIn::Everyone,
            is_visible: true,
            interests: Vec::new(),
            about_me: None,
            height_cm: None,
            profile_photo_url: None,
        }
    }

    /// A like row in the older profile-keyed shape
    pub fn legacy_like(id: &str, from_profile: &str, to_profile: &str, is_mutual: bool) -> Value {
        json!({
            "id": id,
            "event_id": "evt",
            "from_profile_id": from_profile,
            "to_profile_id": to_profile,
            "is_mutual": is_mutual,
            "created_at": "2020-01-10T20:00:00Z",
        })
    }
}
