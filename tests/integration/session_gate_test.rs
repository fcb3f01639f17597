//! Joining an event and resuming it on the next launch

use crate::assert_ok;
use crate::common::{live_event, TestClient};
use chrono::{Duration, Utc};
use mingle::client::session::SessionGate;
use mingle::client::store::EVENTS;
use mingle::client::StartupRoute;

#[tokio::test]
async fn test_join_then_resume_after_restart() {
    let first = TestClient::new().await;
    let event = first.seed_event().await;
    let now = Utc::now();

    let joined = assert_ok!(first.client.join_event("  test ", now).await).expect("event is live");
    assert_eq!(joined.event, event);
    assert!(!joined.session_id.is_empty());

    let second = TestClient::with_storage(first.store.clone(), first.storage.clone()).await;
    let gate = SessionGate::new(second.client.sessions().clone());
    assert_eq!(
        assert_ok!(gate.resolve(now).await),
        StartupRoute::ResumeDiscovery {
            event,
            session_id: joined.session_id,
        }
    );
}

#[tokio::test]
async fn test_cached_session_ends_with_the_event() {
    let harness = TestClient::new().await;
    let event = harness.seed_event().await;
    assert_ok!(harness.client.join_event("TEST", Utc::now()).await);

    let gate = SessionGate::new(harness.client.sessions().clone());
    let after = event.expires_at + Duration::minutes(1);
    assert_eq!(assert_ok!(gate.resolve(after).await), StartupRoute::JoinEvent);
    assert!(assert_ok!(harness.client.sessions().event_session().await).is_none());
}

#[tokio::test]
async fn test_join_rejects_unknown_expired_and_upcoming_codes() {
    let harness = TestClient::new().await;
    let now = Utc::now();

    assert!(assert_ok!(harness.client.join_event("NOPE", now).await).is_none());

    let mut expired = live_event();
    expired.id = "evt-old".to_string();
    expired.event_code = "OLD".to_string();
    expired.starts_at = now - Duration::days(2);
    expired.expires_at = now - Duration::days(1);
    harness
        .store
        .seed(EVENTS, serde_json::to_value(&expired).unwrap())
        .await;
    assert!(assert_ok!(harness.client.join_event("old", now).await).is_none());

    let mut upcoming = live_event();
    upcoming.id = "evt-soon".to_string();
    upcoming.event_code = "SOON".to_string();
    upcoming.starts_at = now + Duration::hours(2);
    upcoming.expires_at = now + Duration::hours(6);
    harness
        .store
        .seed(EVENTS, serde_json::to_value(&upcoming).unwrap())
        .await;
    assert!(assert_ok!(harness.client.join_event("SOON", now).await).is_none());

    assert!(assert_ok!(harness.client.sessions().event_session().await).is_none());
}

#[tokio::test]
async fn test_admin_flag_outranks_cached_session() {
    let harness = TestClient::new().await;
    harness.seed_event().await;
    let now = Utc::now();
    assert_ok!(harness.client.join_event("TEST", now).await);

    let sessions = harness.client.sessions();
    assert_ok!(sessions.set_admin_session(now).await);
    let gate = SessionGate::new(sessions.clone());
    assert_eq!(assert_ok!(gate.resolve(now).await), StartupRoute::AdminDashboard);

    assert_ok!(sessions.clear_admin_session().await);
    assert!(matches!(
        assert_ok!(gate.resolve(now).await),
        StartupRoute::ResumeDiscovery { .. }
    ));
}
