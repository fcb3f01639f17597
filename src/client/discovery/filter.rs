//! Compatibility filter.
//!
//! Decides whether another attendee belongs in the current attendee's
//! discovery pool. Pure and deterministic: no store access, no clock.

use crate::shared::profile::MIN_AGE;
use crate::shared::{GenderIdentity, Profile};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Upper bound of the default age band
pub const DEFAULT_MAX_AGE: u32 = 99;

/// Gender restriction chosen on the discovery screen
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum GenderFilter {
    #[default]
    All,
    Man,
    Woman,
    NonBinary,
}

impl GenderFilter {
    pub fn allows(self, identity: GenderIdentity) -> bool {
        match self {
            GenderFilter::All => true,
            GenderFilter::Man => identity == GenderIdentity::Man,
            GenderFilter::Woman => identity == GenderIdentity::Woman,
            GenderFilter::NonBinary => identity == GenderIdentity::NonBinary,
        }
    }
}

/// Session-chosen discovery criteria
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveryFilters {
    pub age_min: u32,
    pub age_max: u32,
    pub gender: GenderFilter,
    /// Empty means any interests, including none
    pub interest_tags: Vec<String>,
}

impl Default for DiscoveryFilters {
    fn default() -> Self {
        Self {
            age_min: MIN_AGE,
            age_max: DEFAULT_MAX_AGE,
            gender: GenderFilter::All,
            interest_tags: Vec::new(),
        }
    }
}

impl DiscoveryFilters {
    pub fn with_age_range(mut self, age_min: u32, age_max: u32) -> Self {
        self.age_min = age_min;
        self.age_max = age_max;
        self
    }

    pub fn with_gender(mut self, gender: GenderFilter) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_interests<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interest_tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Both attendees fall in each other's "interested in" category
pub fn orientation_compatible(a: &Profile, b: &Profile) -> bool {
    a.interested_in.accepts(b.gender_identity) && b.interested_in.accepts(a.gender_identity)
}

/// Whether `other` should appear in `me`'s discovery pool
pub fn is_candidate(me: &Profile, other: &Profile, filters: &DiscoveryFilters) -> bool {
    if other.session_id == me.session_id || !other.is_visible {
        return false;
    }
    if !orientation_compatible(me, other) {
        return false;
    }
    if other.age < filters.age_min || other.age > filters.age_max {
        return false;
    }
    if !filters.gender.allows(other.gender_identity) {
        return false;
    }
    shares_interest(&other.interests, &filters.interest_tags)
}

fn shares_interest(interests: &[String], wanted: &[String]) -> bool {
    if wanted.is_empty() {
        return true;
    }
    let wanted: HashSet<String> = wanted.iter().map(|tag| normalize_tag(tag)).collect();
    interests
        .iter()
        .any(|tag| wanted.contains(&normalize_tag(tag)))
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Filter `profiles` down to `me`'s candidates, keeping input order
pub fn candidate_pool<'a, I>(me: &Profile, profiles: I, filters: &DiscoveryFilters) -> Vec<Profile>
where
    I: IntoIterator<Item = &'a Profile>,
{
    profiles
        .into_iter()
        .filter(|other| is_candidate(me, other, filters))
        .cloned()
        .collect()
}
