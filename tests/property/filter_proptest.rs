//! Property-based tests for the compatibility filter

use chrono::Utc;
use mingle::client::discovery::{candidate_pool, is_candidate, orientation_compatible};
use mingle::client::DiscoveryFilters;
use mingle::shared::{GenderIdentity, InterestedIn, Profile};
use proptest::prelude::*;

fn identity() -> impl Strategy<Value = GenderIdentity> {
    prop_oneof![
        Just(GenderIdentity::Man),
        Just(GenderIdentity::Woman),
        Just(GenderIdentity::NonBinary),
    ]
}

fn interested_in() -> impl Strategy<Value = InterestedIn> {
    prop_oneof![
        Just(InterestedIn::Men),
        Just(InterestedIn::Women),
        Just(InterestedIn::Everyone),
        Just(InterestedIn::NonBinary),
        Just(InterestedIn::MenAndNonBinary),
        Just(InterestedIn::WomenAndNonBinary),
    ]
}

prop_compose! {
    fn profile()(
        session in "[a-z]{1,8}",
        age in 18u32..99,
        gender_identity in identity(),
        interested_in in interested_in(),
        is_visible in any::<bool>(),
        interests in prop::collection::vec("[a-z]{3,6}", 0..4),
    ) -> Profile {
        let now = Utc::now();
        Profile {
            id: format!("p-{}", session),
            event_id: "evt".to_string(),
            session_id: session.clone(),
            first_name: session,
            age,
            gender_identity,
            interested_in,
            is_visible,
            interests,
            about_me: None,
            height_cm: None,
            profile_photo_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

proptest! {
    #[test]
    fn test_orientation_is_symmetric(a in profile(), b in profile()) {
        prop_assert_eq!(orientation_compatible(&a, &b), orientation_compatible(&b, &a));
    }

    #[test]
    fn test_default_filters_are_symmetric_between_visible_attendees(
        mut a in profile(),
        mut b in profile(),
    ) {
        prop_assume!(a.session_id != b.session_id);
        a.is_visible = true;
        b.is_visible = true;
        let filters = DiscoveryFilters::default();
        prop_assert_eq!(is_candidate(&a, &b, &filters), is_candidate(&b, &a, &filters));
    }

    #[test]
    fn test_never_a_candidate_for_yourself(me in profile()) {
        prop_assert!(!is_candidate(&me, &me, &DiscoveryFilters::default()));
    }

    #[test]
    fn test_pool_respects_age_range(
        me in profile(),
        others in prop::collection::vec(profile(), 0..12),
        low in 18u32..60,
        span in 0u32..30,
    ) {
        let filters = DiscoveryFilters::default().with_age_range(low, low + span);
        for candidate in candidate_pool(&me, &others, &filters) {
            prop_assert!(candidate.age >= low && candidate.age <= low + span);
            prop_assert!(candidate.is_visible);
            prop_assert_ne!(&candidate.session_id, &me.session_id);
        }
    }

    #[test]
    fn test_pool_keeps_input_order(
        me in profile(),
        others in prop::collection::vec(profile(), 0..12),
    ) {
        let pool = candidate_pool(&me, &others, &DiscoveryFilters::default());
        let expected: Vec<&Profile> = others
            .iter()
            .filter(|other| is_candidate(&me, other, &DiscoveryFilters::default()))
            .collect();
        prop_assert_eq!(pool.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_interest_tags_ignore_case(me in profile(), mut other in profile(), tag in "[a-z]{3,6}") {
        prop_assume!(me.session_id != other.session_id);
        other.is_visible = true;
        other.interests = vec![format!("  {} ", tag.to_uppercase())];
        let filters = DiscoveryFilters::default().with_interests([tag]);
        prop_assert_eq!(
            is_candidate(&me, &other, &filters),
            orientation_compatible(&me, &other)
        );
    }
}
