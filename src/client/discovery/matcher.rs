//! Mutual-like detection.
//!
//! Per ordered pair the state moves from no like, to one-sided, to mutual.
//! Mutual is terminal. The flip to mutual writes both rows in one batch.

use crate::client::directory::Directory;
use crate::client::error::CoreError;
use crate::shared::{Like, NewLike};
use std::collections::HashMap;
use std::sync::Arc;

/// Result of a like action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    /// Liking yourself is a silent no-op
    Ignored,
    /// An edge to this target already exists
    AlreadyLiked,
    /// One-sided: the target has not liked back yet
    Pending(Like),
    /// Reciprocal like found and both rows flipped to mutual
    Matched { mine: Like, peer: Like },
}

impl LikeOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, LikeOutcome::Matched { .. })
    }
}

#[derive(Debug, Clone)]
pub struct MatchDetector {
    directory: Arc<Directory>,
}

impl MatchDetector {
    pub fn new(directory: Arc<Directory>) -> Self {
        Self { directory }
    }

    /// Record that `liker` likes `liked`.
    ///
    /// `known` holds the likes the caller already loaded; a hit there
    /// short-circuits before any remote call.
    pub async fn like(
        &self,
        event_id: &str,
        liker: &str,
        liked: &str,
        known: &[Like],
    ) -> Result<LikeOutcome, CoreError> {
        if liker == liked {
            tracing::debug!(session = liker, "ignoring self-like");
            return Ok(LikeOutcome::Ignored);
        }
        if known.iter().any(|like| like.connects(liker, liked)) {
            return Ok(LikeOutcome::AlreadyLiked);
        }

        let mine = match self.directory.find_like(event_id, liker, liked).await? {
            Some(existing) if existing.is_mutual => return Ok(LikeOutcome::AlreadyLiked),
            Some(existing) => {
                // An earlier attempt wrote the edge but may not have completed
                // the flip. Finish it if the peer has liked back.
                return match self.directory.find_like(event_id, liked, liker).await? {
                    Some(peer) => self.flip(event_id, existing, peer).await,
                    None => Ok(LikeOutcome::AlreadyLiked),
                };
            }
            None => {
                self.directory
                    .create_like(&NewLike::new(event_id, liker, liked))
                    .await?
            }
        };

        match self.directory.find_like(event_id, liked, liker).await? {
            Some(peer) => self.flip(event_id, mine, peer).await,
            None => {
                tracing::debug!(event_id, liker, liked, "like recorded");
                Ok(LikeOutcome::Pending(mine))
            }
        }
    }

    async fn flip(&self, event_id: &str, mine: Like, peer: Like) -> Result<LikeOutcome, CoreError> {
        let (mine, peer) = self.directory.mark_mutual(&mine, &peer).await?;
        tracing::info!(
            event_id,
            liker = %mine.liker_session_id,
            liked = %mine.liked_session_id,
            "match created"
        );
        Ok(LikeOutcome::Matched { mine, peer })
    }

    /// Flip every reciprocal pair in the event that is not yet mutual on
    /// both rows. Returns the number of pairs repaired.
    pub async fn reconcile_matches(&self, event_id: &str) -> Result<usize, CoreError> {
        let likes = self.directory.event_likes(event_id).await?;
        let edges: HashMap<(&str, &str), &Like> = likes
            .iter()
            .map(|like| ((like.liker_session_id.as_str(), like.liked_session_id.as_str()), like))
            .collect();

        let mut repaired = 0;
        for like in &likes {
            let (liker, liked) = (like.liker_session_id.as_str(), like.liked_session_id.as_str());
            if liker >= liked {
                continue;
            }
            let Some(reverse) = edges.get(&(liked, liker)) else {
                continue;
            };
            if like.is_mutual && reverse.is_mutual {
                continue;
            }

            // The newer row is the one that completed the pair.
            let (completing, earlier) = if like.created_at >= reverse.created_at {
                (like, *reverse)
            } else {
                (*reverse, like)
            };
            self.directory.mark_mutual(completing, earlier).await?;
            repaired += 1;
        }

        if repaired > 0 {
            tracing::warn!(event_id, repaired, "repaired half-written matches");
        }
        Ok(repaired)
    }

    /// Session ids `session` is matched with
    pub async fn matches_for(&self, event_id: &str, session: &str) -> Result<Vec<String>, CoreError> {
        Ok(self
            .directory
            .likes_from(event_id, session)
            .await?
            .into_iter()
            .filter(|like| like.is_mutual)
            .map(|like| like.liked_session_id)
            .collect())
    }

    /// The session's own like rows that carry a match notification
    pub async fn pending_match_notifications(&self, event_id: &str, session: &str) -> Result<Vec<Like>, CoreError> {
        Ok(self
            .directory
            .likes_from(event_id, session)
            .await?
            .into_iter()
            .filter(Like::has_match_notification)
            .collect())
    }
}
