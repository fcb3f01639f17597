//! Offline capture, durability across restarts, and replay

use crate::common::{draft, TestClient, EVENT_ID};
use crate::{assert_in_range, assert_ok, assert_queued};
use mingle::client::local_db::{LocalDatabase, MemoryStorage};
use mingle::client::offline::{OfflineQueue, QueueConfig, QueuedWrite, RetryPolicy};
use mingle::client::store::{StoreErrorKind, StoreOp, LIKES, PROFILES};
use mingle::client::{LikeOutcome, WriteOutcome};
use mingle::shared::{GenderIdentity, InterestedIn};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_unreachable_like_is_queued_after_three_attempts() {
    let harness = TestClient::new().await;
    let client = &harness.client;
    let event = harness.seed_event().await;
    harness.network.set_online(false);

    let outcome = assert_ok!(client.like(&event, "a", "b", &[]).await);
    assert_queued!(outcome);

    let stats = client.directory().retry().get_stats();
    assert_eq!(stats.attempts, 3);
    assert_eq!(stats.exhausted, 1);
    assert_eq!(harness.store.calls(StoreOp::Query).await, 0);
    assert_eq!(client.offline().queue().len().await, 1);

    // Nothing happens while still offline.
    let report = client.process_queue().await;
    assert!(!report.ran);
    assert_eq!(report.remaining, 1);

    harness.network.set_online(true);
    let report = client.process_queue().await;
    assert!(report.ran);
    assert_eq!(report.succeeded, 1);
    assert!(client.offline().queue().is_empty().await);
    assert_eq!(harness.store.len(LIKES).await, 1);
}

#[tokio::test]
async fn test_queue_survives_restart() {
    let first = TestClient::new().await;
    let event = first.seed_event().await;
    first.network.set_online(false);

    for target in ["b", "c", "d"] {
        let outcome = assert_ok!(first.client.like(&event, "a", target, &[]).await);
        assert_queued!(outcome);
    }
    let profile = assert_ok!(
        first
            .client
            .upsert_profile(&draft("a", GenderIdentity::NonBinary, InterestedIn::Everyone, 31))
            .await
    );
    assert_queued!(profile);

    // Same device storage and remote store, new process.
    let store = first.store.clone();
    let storage = first.storage.clone();
    drop(first);
    let second = TestClient::with_storage(store, storage).await;
    assert_eq!(second.client.offline().queue().len().await, 4);

    let report = second.client.process_queue().await;
    assert_eq!(report.succeeded, 4);
    assert_eq!(second.store.len(LIKES).await, 3);
    assert_eq!(second.store.len(PROFILES).await, 1);
}

#[tokio::test]
async fn test_sqlite_queue_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.db");

    {
        let db = Arc::new(assert_ok!(LocalDatabase::open_at(&path).await));
        let queue = OfflineQueue::new(db, QueueConfig::default());
        assert_ok!(queue.initialize().await);
        for peer in ["x", "y"] {
            assert_ok!(
                queue
                    .enqueue(QueuedWrite::MarkConversationRead {
                        event_id: EVENT_ID.to_string(),
                        reader_session_id: "a".to_string(),
                        peer_session_id: peer.to_string(),
                    })
                    .await
            );
        }
    }

    let db = Arc::new(assert_ok!(LocalDatabase::open_at(&path).await));
    let queue = OfflineQueue::new(db, QueueConfig::default());
    assert_eq!(assert_ok!(queue.initialize().await), 2);
    let pending = queue.pending().await;
    assert!(matches!(
        &pending[1].write,
        QueuedWrite::MarkConversationRead { peer_session_id, .. } if peer_session_id == "y"
    ));
}

#[tokio::test]
async fn test_reconnect_drains_queue_automatically() {
    let harness = TestClient::new().await;
    let event = harness.seed_event().await;
    harness.network.set_online(false);

    let listener = harness.client.spawn_reconnect_listener();
    assert_queued!(assert_ok!(harness.client.like(&event, "a", "b", &[]).await));

    harness.network.set_online(true);
    let mut waited = Duration::ZERO;
    while !harness.client.offline().queue().is_empty().await {
        assert!(waited < Duration::from_secs(5), "queue was never drained");
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }

    assert_eq!(harness.store.len(LIKES).await, 1);
    listener.abort();
}

#[tokio::test]
async fn test_operation_dropped_after_replay_cap() {
    let harness = TestClient::new().await;
    let event = harness.seed_event().await;
    harness.network.set_online(false);
    assert_queued!(assert_ok!(harness.client.like(&event, "a", "b", &[]).await));
    harness.network.set_online(true);

    // The store stays unavailable for every replay.
    harness
        .store
        .fail_next(StoreErrorKind::Unavailable, u32::MAX)
        .await;

    let queue = harness.client.offline().queue();
    let mut dropped = Vec::new();
    for _ in 0..5 {
        let report = harness.client.process_queue().await;
        dropped.extend(report.dropped);
    }

    assert!(queue.is_empty().await);
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].retry_count, 5);
    assert!(dropped[0].last_error.is_some());
    let stats = queue.get_stats().await;
    assert_eq!(stats.dropped_failed, 1);
    assert_eq!(stats.completed, 0);
}

#[tokio::test]
async fn test_capacity_drops_oldest() {
    let storage = MemoryStorage::new();
    let queue = OfflineQueue::new(
        Arc::new(storage),
        QueueConfig {
            capacity: 2,
            max_attempts: 5,
        },
    );
    for peer in ["1", "2", "3"] {
        assert_ok!(
            queue
                .enqueue(QueuedWrite::CreateLike {
                    event_id: EVENT_ID.to_string(),
                    liker_session_id: "a".to_string(),
                    liked_session_id: peer.to_string(),
                })
                .await
        );
    }

    let pending = queue.pending().await;
    assert_eq!(pending.len(), 2);
    assert!(matches!(
        &pending[0].write,
        QueuedWrite::CreateLike { liked_session_id, .. } if liked_session_id == "2"
    ));
    assert_eq!(queue.get_stats().await.dropped_overflow, 1);
}

#[tokio::test]
async fn test_online_write_is_applied_not_queued() {
    let harness = TestClient::new().await;
    let event = harness.seed_event().await;
    let outcome = assert_ok!(harness.client.like(&event, "a", "b", &[]).await);
    assert!(matches!(outcome, WriteOutcome::Applied(LikeOutcome::Pending(_))));
    assert!(harness.client.offline().queue().is_empty().await);
}

#[tokio::test]
async fn test_replayed_like_with_lost_response_writes_one_row() {
    let harness = TestClient::new().await;
    let client = &harness.client;
    let event = harness.seed_event().await;
    harness.network.set_online(false);
    assert_queued!(assert_ok!(client.like(&event, "a", "b", &[]).await));

    harness.network.set_online(true);
    harness
        .store
        .fail_op_after_commit(StoreOp::Create, StoreErrorKind::Timeout, 1)
        .await;
    let report = client.process_queue().await;

    assert_eq!(report.succeeded, 1);
    assert!(client.offline().queue().is_empty().await);
    assert_eq!(harness.store.len(LIKES).await, 1);
}

#[test]
fn test_retry_delay_doubles_within_jitter() {
    let policy = RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(10),
        max_jitter: Duration::from_millis(5),
    };
    for attempt in 1..=4u32 {
        let floor = Duration::from_millis(10 * 2u64.pow(attempt - 1));
        for _ in 0..20 {
            assert_in_range!(policy.delay_for(attempt), floor, floor + Duration::from_millis(5));
        }
    }
}
