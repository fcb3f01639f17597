//! Like edges.
//!
//! A like is a directed edge inside one event. The mutual flip writes both
//! reciprocal rows in a single batch so neither side can observe a half-made
//! match.

use super::Directory;
use crate::client::error::CoreError;
use crate::client::store::{Direction, Query, LIKES};
use crate::shared::{Like, NewLike};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Rows written before likes were keyed by session. They name profiles,
/// which are resolved to their sessions on read.
#[derive(Debug, Deserialize)]
struct LegacyLike {
    id: String,
    event_id: String,
    from_profile_id: String,
    to_profile_id: String,
    #[serde(default)]
    is_mutual: bool,
    #[serde(default)]
    liker_notified_of_match: bool,
    #[serde(default)]
    liked_notified_of_match: bool,
    created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    updated_at: DateTime<Utc>,
}

impl LegacyLike {
    fn into_like(self, liker_session_id: String, liked_session_id: String) -> Like {
        Like {
            id: self.id,
            event_id: self.event_id,
            liker_session_id,
            liked_session_id,
            is_mutual: self.is_mutual,
            liker_notified_of_match: self.liker_notified_of_match,
            liked_notified_of_match: self.liked_notified_of_match,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn is_legacy(doc: &Value) -> bool {
    doc.get("liker_session_id").is_none() && doc.get("from_profile_id").is_some()
}

impl Directory {
    /// The edge `liker -> liked`, if one has been written
    pub async fn find_like(&self, event_id: &str, liker: &str, liked: &str) -> Result<Option<Like>, CoreError> {
        let query = Query::new()
            .eq("event_id", event_id)
            .eq("liker_session_id", liker)
            .eq("liked_session_id", liked);
        let likes = self.query_likes("find_like", &query).await?;
        if let Some(like) = likes.into_iter().next() {
            return Ok(Some(like));
        }
        self.find_legacy_like(event_id, liker, liked).await
    }

    async fn find_legacy_like(&self, event_id: &str, liker: &str, liked: &str) -> Result<Option<Like>, CoreError> {
        let Some(from) = self.profile_for_session(event_id, liker).await? else {
            return Ok(None);
        };
        let Some(to) = self.profile_for_session(event_id, liked).await? else {
            return Ok(None);
        };
        let query = Query::new()
            .eq("event_id", event_id)
            .eq("from_profile_id", from.id)
            .eq("to_profile_id", to.id);
        let rows: Vec<LegacyLike> = self.query_records("find_like", LIKES, &query).await?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.into_like(liker.to_string(), liked.to_string())))
    }

    /// Write the edge under its deterministic id. Safe to repeat: a second
    /// create of the same edge returns the row already stored.
    pub async fn create_like(&self, like: &NewLike) -> Result<Like, CoreError> {
        self.create_record_once("create_like", LIKES, &like.id, like)
            .await
    }

    /// Likes sent by `session`, oldest first
    pub async fn likes_from(&self, event_id: &str, session: &str) -> Result<Vec<Like>, CoreError> {
        self.likes_touching(event_id, session, "liker_session_id", "from_profile_id", "likes_from")
            .await
    }

    /// Likes received by `session`, oldest first
    pub async fn likes_to(&self, event_id: &str, session: &str) -> Result<Vec<Like>, CoreError> {
        self.likes_touching(event_id, session, "liked_session_id", "to_profile_id", "likes_to")
            .await
    }

    async fn likes_touching(
        &self,
        event_id: &str,
        session: &str,
        session_field: &str,
        profile_field: &str,
        name: &str,
    ) -> Result<Vec<Like>, CoreError> {
        let query = Query::new()
            .eq("event_id", event_id)
            .eq(session_field, session)
            .order_by("created_at", Direction::Asc);
        let mut likes = self.query_likes(name, &query).await?;

        if let Some(profile) = self.profile_for_session(event_id, session).await? {
            let legacy = Query::new()
                .eq("event_id", event_id)
                .eq(profile_field, profile.id)
                .order_by("created_at", Direction::Asc);
            let older = self.query_likes(name, &legacy).await?;
            if !older.is_empty() {
                likes.extend(older);
                likes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            }
        }
        Ok(likes)
    }

    pub async fn event_likes(&self, event_id: &str) -> Result<Vec<Like>, CoreError> {
        let query = Query::new()
            .eq("event_id", event_id)
            .order_by("created_at", Direction::Asc);
        self.query_likes("event_likes", &query).await
    }

    async fn query_likes(&self, name: &str, query: &Query) -> Result<Vec<Like>, CoreError> {
        let docs = self.query_docs(name, LIKES, query).await?;
        self.decode_likes(docs).await
    }

    /// Decode like rows of either shape. Legacy rows whose profiles no
    /// longer exist are skipped.
    async fn decode_likes(&self, docs: Vec<Value>) -> Result<Vec<Like>, CoreError> {
        let mut sessions: HashMap<String, Option<String>> = HashMap::new();
        let mut likes = Vec::with_capacity(docs.len());
        for doc in docs {
            if !is_legacy(&doc) {
                likes.push(serde_json::from_value(doc)?);
                continue;
            }
            let row: LegacyLike = serde_json::from_value(doc)?;
            let liker = self.session_of_profile(&row.from_profile_id, &mut sessions).await?;
            let liked = self.session_of_profile(&row.to_profile_id, &mut sessions).await?;
            match (liker, liked) {
                (Some(liker), Some(liked)) => likes.push(row.into_like(liker, liked)),
                _ => tracing::warn!(like_id = %row.id, "skipping legacy like with a missing profile"),
            }
        }
        Ok(likes)
    }

    async fn session_of_profile(
        &self,
        profile_id: &str,
        cache: &mut HashMap<String, Option<String>>,
    ) -> Result<Option<String>, CoreError> {
        if let Some(known) = cache.get(profile_id) {
            return Ok(known.clone());
        }
        let session = self
            .profile_by_id(profile_id)
            .await?
            .map(|profile| profile.session_id);
        cache.insert(profile_id.to_string(), session.clone());
        Ok(session)
    }

    /// Flip `completing` (the like that closed the loop) and `earlier` (the
    /// reverse edge that already existed) to mutual in one batch.
    ///
    /// The completing row gets `liked_notified_of_match`, the earlier row gets
    /// `liker_notified_of_match`, so each attendee finds a notification on
    /// their own row. Returns the rows in that order.
    pub async fn mark_mutual(&self, completing: &Like, earlier: &Like) -> Result<(Like, Like), CoreError> {
        let updates = vec![
            (
                completing.id.clone(),
                json!({ "is_mutual": true, "liked_notified_of_match": true }),
            ),
            (
                earlier.id.clone(),
                json!({ "is_mutual": true, "liker_notified_of_match": true }),
            ),
        ];

        let docs = self
            .batch_update_docs("mark_mutual", LIKES, updates)
            .await?;
        let mut written = self.decode_likes(docs).await?;
        if written.len() != 2 {
            return Err(crate::shared::SharedError::conflict(format!(
                "mutual flip wrote {} rows, expected 2",
                written.len()
            ))
            .into());
        }
        let earlier = written.remove(1);
        let completing = written.remove(0);
        Ok((completing, earlier))
    }
}
