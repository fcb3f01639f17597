//! The client core over the REST store adapter

use crate::common::{fast_config, like_document, live_event, start_document_api, EVENT_ID};
use crate::assert_ok;
use assert_matches::assert_matches;
use mingle::client::local_db::MemoryStorage;
use mingle::client::store::RestStore;
use mingle::client::{CoreError, LikeOutcome, MingleClient, NetworkMonitor, StoreErrorKind, WriteOutcome};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> MingleClient {
    MingleClient::new(
        Arc::new(RestStore::new(server.uri())),
        Arc::new(MemoryStorage::new()),
        NetworkMonitor::online(),
        &fast_config(),
    )
}

#[tokio::test]
async fn test_like_retries_through_unavailable() {
    let server = start_document_api().await;
    Mock::given(method("GET"))
        .and(path("/likes"))
        .and(query_param("event_id", EVENT_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/event_profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/likes"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/likes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(like_document("l1", "a", "b", false)))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = assert_ok!(client.like(&live_event(), "a", "b", &[]).await);
    assert_matches!(outcome, WriteOutcome::Applied(LikeOutcome::Pending(like)) if like.id == "l1");

    let requests = server.received_requests().await.unwrap_or_default();
    let posts = requests.iter().filter(|r| r.method.to_string() == "POST").count();
    assert_eq!(posts, 2);
    assert_eq!(client.directory().retry().get_stats().retries, 1);
}

#[tokio::test]
async fn test_permission_denied_is_not_queued() {
    let server = start_document_api().await;
    Mock::given(method("GET"))
        .and(path("/likes"))
        .respond_with(ResponseTemplate::new(403).set_body_string("rules rejected read"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.like(&live_event(), "a", "b", &[]).await;
    assert_matches!(result, Err(CoreError::Store(err)) if err.kind == StoreErrorKind::PermissionDenied);
    assert!(client.offline().queue().is_empty().await);
}

#[tokio::test]
async fn test_gateway_timeout_is_queued() {
    let server = start_document_api().await;
    Mock::given(method("GET"))
        .and(path("/likes"))
        .respond_with(ResponseTemplate::new(504))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = assert_ok!(client.like(&live_event(), "a", "b", &[]).await);
    assert!(outcome.is_queued());
    assert_eq!(client.offline().queue().len().await, 1);
}
