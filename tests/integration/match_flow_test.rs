//! Discovery, like, match and chat from two attendees' points of view

use crate::common::{draft, TestClient, EVENT_ID};
use crate::{assert_err, assert_ok};
use mingle::client::store::{StoreErrorKind, StoreOp, LIKES};
use mingle::client::{CoreError, DiscoveryFilters, LikeOutcome, WriteOutcome};
use mingle::shared::{GenderIdentity, InterestedIn, NewMessage, SharedError};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_two_attendees_match_and_chat() {
    let harness = TestClient::new().await;
    let client = &harness.client;
    let event = harness.seed_event().await;

    let sam = assert_ok!(
        client
            .upsert_profile(&draft("sam", GenderIdentity::Man, InterestedIn::Women, 29))
            .await
    )
    .applied()
    .unwrap();
    assert_ok!(
        client
            .upsert_profile(&draft("kim", GenderIdentity::Woman, InterestedIn::Everyone, 25))
            .await
    );
    assert_ok!(
        client
            .upsert_profile(&draft("lee", GenderIdentity::Woman, InterestedIn::Women, 27))
            .await
    );

    let filters = DiscoveryFilters::default().with_age_range(18, 30);
    let pool = assert_ok!(client.candidates(&sam, &filters).await);
    let names: Vec<&str> = pool.iter().map(|p| p.session_id.as_str()).collect();
    assert_eq!(names, vec!["kim"]);

    let first = assert_ok!(client.like(&event, "sam", "kim", &[]).await);
    assert!(matches!(first, WriteOutcome::Applied(LikeOutcome::Pending(_))));

    // No chat before the match.
    let early = client
        .send_message(&NewMessage::new(EVENT_ID, "sam", "kim", "hi!"))
        .await;
    assert_err!(early, CoreError::Shared(SharedError::ConflictError { .. }));

    let second = assert_ok!(client.like(&event, "kim", "sam", &[]).await);
    let WriteOutcome::Applied(LikeOutcome::Matched { mine, peer }) = second else {
        panic!("expected a match, got {:?}", second);
    };
    assert!(mine.is_mutual && mine.liked_notified_of_match && !mine.liker_notified_of_match);
    assert!(peer.is_mutual && peer.liker_notified_of_match && !peer.liked_notified_of_match);

    let sam_notes = assert_ok!(client.matcher().pending_match_notifications(EVENT_ID, "sam").await);
    let kim_notes = assert_ok!(client.matcher().pending_match_notifications(EVENT_ID, "kim").await);
    assert_eq!(sam_notes.len(), 1);
    assert_eq!(kim_notes.len(), 1);

    assert_ok!(
        client
            .send_message(&NewMessage::new(EVENT_ID, "sam", "kim", "hi!"))
            .await
    );
    assert_ok!(
        client
            .send_message(&NewMessage::new(EVENT_ID, "kim", "sam", "hey, by the bar?"))
            .await
    );
    let conversation = assert_ok!(client.directory().conversation(EVENT_ID, "sam", "kim").await);
    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation[0].content, "hi!");

    let read = assert_ok!(client.mark_conversation_read(EVENT_ID, "sam", "kim").await);
    assert_eq!(read, WriteOutcome::Applied(1));
}

#[tokio::test]
async fn test_liking_twice_keeps_one_row() {
    let harness = TestClient::new().await;
    let event = harness.seed_event().await;

    assert_ok!(harness.client.like(&event, "a", "b", &[]).await);
    let again = assert_ok!(harness.client.like(&event, "a", "b", &[]).await);

    assert_eq!(again, WriteOutcome::Applied(LikeOutcome::AlreadyLiked));
    assert_eq!(harness.store.len(LIKES).await, 1);
}

#[tokio::test]
async fn test_both_rows_end_mutual_after_flip_failure() {
    let harness = TestClient::new().await;
    let client = &harness.client;
    let event = harness.seed_event().await;

    assert_ok!(client.like(&event, "a", "b", &[]).await);

    // Every attempt of the flip fails with a non-connectivity transient
    // error: the like is written, the flip is not, nothing is queued.
    harness
        .store
        .fail_op(StoreOp::BatchUpdate, StoreErrorKind::Internal, 3)
        .await;
    let result = client.like(&event, "b", "a", &[]).await;
    assert_err!(result);
    assert!(client.offline().queue().is_empty().await);

    let likes = assert_ok!(client.directory().event_likes(EVENT_ID).await);
    assert_eq!(likes.len(), 2);
    assert!(likes.iter().all(|like| !like.is_mutual));

    assert_eq!(assert_ok!(client.matcher().reconcile_matches(EVENT_ID).await), 1);
    let likes = assert_ok!(client.directory().event_likes(EVENT_ID).await);
    assert!(likes.iter().all(|like| like.is_mutual));
}

#[tokio::test]
async fn test_unreachable_flip_is_queued_and_completed_on_replay() {
    let harness = TestClient::new().await;
    let client = &harness.client;
    let event = harness.seed_event().await;

    assert_ok!(client.like(&event, "a", "b", &[]).await);

    harness
        .store
        .fail_op(StoreOp::BatchUpdate, StoreErrorKind::Unavailable, 3)
        .await;
    let outcome = assert_ok!(client.like(&event, "b", "a", &[]).await);
    crate::assert_queued!(outcome);

    let report = client.process_queue().await;
    assert_eq!(report.succeeded, 1);

    assert_eq!(assert_ok!(client.matcher().matches_for(EVENT_ID, "a").await), vec!["b"]);
    assert_eq!(assert_ok!(client.matcher().matches_for(EVENT_ID, "b").await), vec!["a"]);
    assert_eq!(harness.store.len(LIKES).await, 2);
}
