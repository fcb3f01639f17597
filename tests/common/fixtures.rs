//! Test fixtures
//!
//! Builders for events and profile drafts, and a [`TestClient`] that wires a
//! [`MingleClient`] to an in-memory store and device storage.

use chrono::{Duration as ChronoDuration, Utc};
use mingle::client::local_db::MemoryStorage;
use mingle::client::store::{MemoryStore, EVENTS};
use mingle::client::{Config, MingleClient, NetworkMonitor};
use mingle::shared::config::AppConfig;
use mingle::shared::{Event, GenderIdentity, InterestedIn, NewProfile};
use std::sync::Arc;
use std::time::Duration;

pub const EVENT_ID: &str = "evt-test";

/// An event that started an hour ago and runs for four more
pub fn live_event() -> Event {
    let now = Utc::now();
    Event {
        id: EVENT_ID.to_string(),
        name: "Test night".to_string(),
        event_code: "TEST".to_string(),
        starts_at: now - ChronoDuration::hours(1),
        expires_at: now + ChronoDuration::hours(4),
        timezone: "UTC".to_string(),
        is_private: false,
    }
}

pub fn draft(session: &str, identity: GenderIdentity, interested_in: InterestedIn, age: u32) -> NewProfile {
    NewProfile {
        event_id: EVENT_ID.to_string(),
        session_id: session.to_string(),
        first_name: session.to_string(),
        age,
        gender_identity: identity,
        interested_in,
        is_visible: true,
        interests: Vec::new(),
        about_me: None,
        height_cm: None,
        profile_photo_url: None,
    }
}

/// Fast retry settings: three attempts, 10 ms base, no jitter
pub fn fast_config() -> Config {
    let builder = AppConfig::builder()
        .max_retries(3)
        .base_delay(Duration::from_millis(10))
        .max_jitter(Duration::ZERO)
        .settle_delay(Duration::from_millis(20));
    Config::with_builder(builder).expect("test config is valid")
}

/// A client plus handles to everything behind it
pub struct TestClient {
    pub client: Arc<MingleClient>,
    pub store: Arc<MemoryStore>,
    pub storage: MemoryStorage,
    pub network: NetworkMonitor,
}

impl TestClient {
    pub async fn new() -> Self {
        Self::with_storage(Arc::new(MemoryStore::new()), MemoryStorage::new()).await
    }

    /// Build over existing store and device storage, as a restarted process
    /// would see them
    pub async fn with_storage(store: Arc<MemoryStore>, storage: MemoryStorage) -> Self {
        let network = NetworkMonitor::online();
        let client = Arc::new(MingleClient::new(
            store.clone(),
            Arc::new(storage.clone()),
            network.clone(),
            &fast_config(),
        ));
        client.initialize().await.expect("queue loads");
        Self {
            client,
            store,
            storage,
            network,
        }
    }

    pub async fn seed_event(&self) -> Event {
        let event = live_event();
        self.store
            .seed(EVENTS, serde_json::to_value(&event).expect("event serializes"))
            .await;
        event
    }
}
