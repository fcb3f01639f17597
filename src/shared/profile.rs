//! Profile Data Structure
//!
//! One profile per attendee per event, keyed by the anonymous session that
//! created it.

use crate::shared::error::SharedError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of interest tags on a profile
pub const MAX_INTERESTS: usize = 3;

/// Minimum attendee age
pub const MIN_AGE: u32 = 18;

/// How an attendee identifies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum GenderIdentity {
    Man,
    Woman,
    NonBinary,
}

/// Who an attendee wants to see
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum InterestedIn {
    Men,
    Women,
    Everyone,
    NonBinary,
    MenAndNonBinary,
    WomenAndNonBinary,
}

impl InterestedIn {
    /// Whether someone with `identity` falls in this category
    pub fn accepts(self, identity: GenderIdentity) -> bool {
        match self {
            InterestedIn::Everyone => true,
            InterestedIn::Men => identity == GenderIdentity::Man,
            InterestedIn::Women => identity == GenderIdentity::Woman,
            InterestedIn::NonBinary => identity == GenderIdentity::NonBinary,
            InterestedIn::MenAndNonBinary => {
                matches!(identity, GenderIdentity::Man | GenderIdentity::NonBinary)
            }
            InterestedIn::WomenAndNonBinary => {
                matches!(identity, GenderIdentity::Woman | GenderIdentity::NonBinary)
            }
        }
    }
}

/// A stored attendee profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// Store-assigned ID
    pub id: String,
    pub event_id: String,
    /// Anonymous, device-local session identifier
    pub session_id: String,
    pub first_name: String,
    pub age: u32,
    pub gender_identity: GenderIdentity,
    pub interested_in: InterestedIn,
    /// Opt-out toggle for discovery
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub about_me: Option<String>,
    #[serde(default)]
    pub height_cm: Option<u16>,
    #[serde(default)]
    pub profile_photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_visible() -> bool {
    true
}

/// Profile fields supplied at join time. Also persisted locally as the
/// saved profile draft.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewProfile {
    pub event_id: String,
    pub session_id: String,
    pub first_name: String,
    pub age: u32,
    pub gender_identity: GenderIdentity,
    pub interested_in: InterestedIn,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about_me: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo_url: Option<String>,
}

impl NewProfile {
    /// Check the profile invariants before anything reaches the store
    pub fn validate(&self) -> Result<(), SharedError> {
        if self.first_name.trim().is_empty() {
            return Err(SharedError::validation("first_name", "first name is required"));
        }
        if self.age < MIN_AGE {
            return Err(SharedError::validation(
                "age",
                format!("attendees must be at least {}", MIN_AGE),
            ));
        }
        validate_interests(&self.interests)
    }
}

/// Partial update applied by the owning session
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender_identity: Option<GenderIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interested_in: Option<InterestedIn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about_me: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo_url: Option<String>,
}

impl ProfilePatch {
    /// Patch that only flips discovery visibility
    pub fn visibility(is_visible: bool) -> Self {
        Self {
            is_visible: Some(is_visible),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SharedError> {
        if let Some(name) = &self.first_name {
            if name.trim().is_empty() {
                return Err(SharedError::validation("first_name", "first name is required"));
            }
        }
        if let Some(age) = self.age {
            if age < MIN_AGE {
                return Err(SharedError::validation(
                    "age",
                    format!("attendees must be at least {}", MIN_AGE),
                ));
            }
        }
        match &self.interests {
            Some(interests) => validate_interests(interests),
            None => Ok(()),
        }
    }
}

fn validate_interests(interests: &[String]) -> Result<(), SharedError> {
    if interests.len() > MAX_INTERESTS {
        return Err(SharedError::validation(
            "interests",
            format!("at most {} interests", MAX_INTERESTS),
        ));
    }
    if interests.iter().any(|tag| tag.trim().is_empty()) {
        return Err(SharedError::validation("interests", "interest tags cannot be blank"));
    }
    Ok(())
}
