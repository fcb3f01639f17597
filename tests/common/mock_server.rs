//! Mock document API helpers for integration tests
//!
//! Wraps a `wiremock` server with canned responses in the shape the
//! document API returns.

use serde_json::{json, Value};
use wiremock::MockServer;

/// Start a mock document API
pub async fn start_document_api() -> MockServer {
    MockServer::start().await
}

/// A stored like document as the API would return it
pub fn like_document(id: &str, liker: &str, liked: &str, is_mutual: bool) -> Value {
    json!({
        "id": id,
        "event_id": super::EVENT_ID,
        "liker_session_id": liker,
        "liked_session_id": liked,
        "is_mutual": is_mutual,
        "liker_notified_of_match": false,
        "liked_notified_of_match": false,
        "created_at": "2026-06-01T20:00:00Z",
        "updated_at": "2026-06-01T20:00:00Z"
    })
}
