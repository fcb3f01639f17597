//! Profile accessors.
//!
//! Exactly one profile exists per (event, session): joining twice updates the
//! existing profile instead of creating a second one.

use super::Directory;
use crate::client::error::CoreError;
use crate::client::store::{Query, PROFILES};
use crate::shared::{NewProfile, Profile, ProfilePatch};

impl Directory {
    /// Create the session's profile, or overwrite it if one already exists
    pub async fn upsert_profile(&self, profile: &NewProfile) -> Result<Profile, CoreError> {
        profile.validate()?;

        match self
            .profile_for_session(&profile.event_id, &profile.session_id)
            .await?
        {
            Some(existing) => {
                let patch = serde_json::to_value(profile)?;
                self.update_record("upsert_profile", PROFILES, &existing.id, patch)
                    .await
            }
            None => self.create_record("upsert_profile", PROFILES, profile).await,
        }
    }

    /// Merge `patch` into the profile
    pub async fn update_profile(&self, profile_id: &str, patch: &ProfilePatch) -> Result<Profile, CoreError> {
        patch.validate()?;
        let patch = serde_json::to_value(patch)?;
        self.update_record("update_profile", PROFILES, profile_id, patch)
            .await
    }

    pub async fn profile_by_id(&self, profile_id: &str) -> Result<Option<Profile>, CoreError> {
        self.get_record("profile_by_id", PROFILES, profile_id).await
    }

    pub async fn profile_for_session(
        &self,
        event_id: &str,
        session_id: &str,
    ) -> Result<Option<Profile>, CoreError> {
        let query = Query::new()
            .eq("event_id", event_id)
            .eq("session_id", session_id);
        let profiles: Vec<Profile> = self
            .query_records("profile_for_session", PROFILES, &query)
            .await?;
        if profiles.len() > 1 {
            tracing::warn!(event_id, session_id, count = profiles.len(), "duplicate profiles for session");
        }
        Ok(profiles.into_iter().next())
    }

    /// Every profile in the event that has not opted out of discovery
    pub async fn visible_profiles(&self, event_id: &str) -> Result<Vec<Profile>, CoreError> {
        let query = Query::new().eq("event_id", event_id).eq("is_visible", true);
        self.query_records("visible_profiles", PROFILES, &query).await
    }

    pub async fn delete_profile(&self, profile_id: &str) -> Result<(), CoreError> {
        self.delete_record("delete_profile", PROFILES, profile_id).await
    }
}
