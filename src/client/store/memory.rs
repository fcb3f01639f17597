//! In-process document store.
//!
//! Backs tests and offline demos. Failures can be injected per operation so
//! the retry, queue and match paths can be exercised without a network.

use super::{DocumentStore, Query, StoreError, StoreErrorKind};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Store operations, used to target injected failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Create,
    Get,
    Query,
    Update,
    Delete,
    BatchUpdate,
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    op: Option<StoreOp>,
    kind: StoreErrorKind,
    remaining: u32,
    /// Apply the write, then report the failure
    after_commit: bool,
}

/// In-memory [`DocumentStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Value>>>,
    faults: Mutex<Vec<Fault>>,
    calls: Mutex<HashMap<StoreOp, u64>>,
    clock: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` calls of any kind with `kind`
    pub async fn fail_next(&self, kind: StoreErrorKind, times: u32) {
        self.faults.lock().await.push(Fault {
            op: None,
            kind,
            remaining: times,
            after_commit: false,
        });
    }

    /// Fail the next `times` calls of `op` with `kind`
    pub async fn fail_op(&self, op: StoreOp, kind: StoreErrorKind, times: u32) {
        self.faults.lock().await.push(Fault {
            op: Some(op),
            kind,
            remaining: times,
            after_commit: false,
        });
    }

    /// Let the next `times` calls of `op` take effect but fail with `kind`,
    /// as when the response to a committed write is lost
    pub async fn fail_op_after_commit(&self, op: StoreOp, kind: StoreErrorKind, times: u32) {
        self.faults.lock().await.push(Fault {
            op: Some(op),
            kind,
            remaining: times,
            after_commit: true,
        });
    }

    /// Drop every pending injected failure
    pub async fn clear_faults(&self) {
        self.faults.lock().await.clear();
    }

    /// Number of times `op` has been called, including failed calls
    pub async fn calls(&self, op: StoreOp) -> u64 {
        self.calls.lock().await.get(&op).copied().unwrap_or(0)
    }

    /// Insert a document verbatim, bypassing id assignment. Used to seed
    /// records such as events that the core never creates itself.
    pub async fn seed(&self, collection: &str, doc: Value) {
        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(doc);
    }

    /// Number of documents in `collection`
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    async fn enter(&self, op: StoreOp) -> Result<(), StoreError> {
        *self.calls.lock().await.entry(op).or_insert(0) += 1;
        self.take_fault(op, false).await
    }

    /// Called once a write has been applied
    async fn leave(&self, op: StoreOp) -> Result<(), StoreError> {
        self.take_fault(op, true).await
    }

    async fn take_fault(&self, op: StoreOp, after_commit: bool) -> Result<(), StoreError> {
        let mut faults = self.faults.lock().await;
        let position = faults.iter().position(|fault| {
            fault.remaining > 0
                && fault.after_commit == after_commit
                && fault.op.map_or(true, |o| o == op)
        });
        if let Some(index) = position {
            let fault = &mut faults[index];
            fault.remaining -= 1;
            let kind = fault.kind;
            if fault.remaining == 0 {
                faults.remove(index);
            }
            return Err(StoreError::new(kind, format!("injected failure on {:?}", op)));
        }
        Ok(())
    }

    /// Timestamps strictly increase so creation order survives ordering by
    /// `created_at` even within one clock tick.
    fn timestamp(&self) -> String {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now() + chrono::Duration::nanoseconds(tick as i64);
        now.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }
}

fn as_object(doc: Value) -> Result<Map<String, Value>, StoreError> {
    match doc {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::new(
            StoreErrorKind::Validation,
            format!("expected a JSON object, got {}", other),
        )),
    }
}

fn merge(target: &mut Value, patch: Map<String, Value>, updated_at: &str) {
    if let Value::Object(fields) = target {
        for (key, value) in patch {
            if key != "id" && key != "created_at" {
                fields.insert(key, value);
            }
        }
        fields.insert("updated_at".to_string(), Value::String(updated_at.to_string()));
    }
}

fn id_of(doc: &Value) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, doc: Value) -> Result<Value, StoreError> {
        self.enter(StoreOp::Create).await?;
        let mut fields = as_object(doc)?;
        let now = self.timestamp();
        let id = match fields.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        fields.insert("id".to_string(), Value::String(id.clone()));
        fields.insert("created_at".to_string(), Value::String(now.clone()));
        fields.insert("updated_at".to_string(), Value::String(now));

        let doc = Value::Object(fields);
        {
            let mut collections = self.collections.lock().await;
            let docs = collections.entry(collection.to_string()).or_default();
            if docs.iter().any(|existing| id_of(existing) == Some(id.as_str())) {
                return Err(StoreError::new(
                    StoreErrorKind::Conflict,
                    format!("{}/{} already exists", collection, id),
                ));
            }
            docs.push(doc.clone());
        }
        self.leave(StoreOp::Create).await?;
        Ok(doc)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.enter(StoreOp::Get).await?;
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| id_of(doc) == Some(id)))
            .cloned())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        self.enter(StoreOp::Query).await?;
        let collections = self.collections.lock().await;
        let mut docs: Vec<Value> = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| query.matches(doc)).cloned().collect())
            .unwrap_or_default();
        query.sort(&mut docs);
        Ok(docs)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Value, StoreError> {
        self.enter(StoreOp::Update).await?;
        let patch = as_object(patch)?;
        let now = self.timestamp();
        let mut collections = self.collections.lock().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| id_of(doc) == Some(id)))
            .ok_or_else(|| StoreError::not_found(format!("{}/{}", collection, id)))?;
        merge(doc, patch, &now);
        let updated = doc.clone();
        drop(collections);
        self.leave(StoreOp::Update).await?;
        Ok(updated)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.enter(StoreOp::Delete).await?;
        let mut collections = self.collections.lock().await;
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(format!("{}/{}", collection, id)))?;
        let before = docs.len();
        docs.retain(|doc| id_of(doc) != Some(id));
        if docs.len() == before {
            return Err(StoreError::not_found(format!("{}/{}", collection, id)));
        }
        Ok(())
    }

    async fn batch_update(
        &self,
        collection: &str,
        updates: Vec<(String, Value)>,
    ) -> Result<Vec<Value>, StoreError> {
        self.enter(StoreOp::BatchUpdate).await?;
        let mut patches = Vec::with_capacity(updates.len());
        for (id, patch) in updates {
            patches.push((id, as_object(patch)?));
        }

        let now = self.timestamp();
        let mut collections = self.collections.lock().await;
        let docs = collections.entry(collection.to_string()).or_default();

        // Resolve every target before touching any of them.
        let mut indices = Vec::with_capacity(patches.len());
        for (id, _) in &patches {
            let index = docs
                .iter()
                .position(|doc| id_of(doc) == Some(id.as_str()))
                .ok_or_else(|| StoreError::not_found(format!("{}/{}", collection, id)))?;
            indices.push(index);
        }

        let mut written = Vec::with_capacity(indices.len());
        for (index, (_, patch)) in indices.into_iter().zip(patches) {
            merge(&mut docs[index], patch, &now);
            written.push(docs[index].clone());
        }
        drop(collections);
        self.leave(StoreOp::BatchUpdate).await?;
        Ok(written)
    }
}
