/*!
 * Mingle headless client
 *
 * Resolves the cached session, joins an event if asked to, then keeps the
 * discovery state and the offline queue in sync until interrupted.
 */
use mingle::client::local_db::LocalDatabase;
use mingle::client::session::{CachedSession, SessionGate};
use mingle::client::store::RestStore;
use mingle::client::sync::SyncService;
use mingle::client::{Config, MingleClient, NetworkMonitor, StartupRoute};
use std::sync::Arc;
use std::time::Duration;

const REACHABILITY_INTERVAL: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "mingle=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = Config::from_env()?;
    let storage = Arc::new(match config.db_path() {
        Some(path) => LocalDatabase::open_at(path).await?,
        None => LocalDatabase::new().await?,
    });

    let mut store = RestStore::new(config.server_url());
    if let Some(key) = config.api_key() {
        store = store.with_api_key(key);
    }

    let network = NetworkMonitor::online();
    let reachability = network.spawn_reachability_check(config.server_url().to_string(), REACHABILITY_INTERVAL);

    let client = Arc::new(MingleClient::new(Arc::new(store), storage, network, &config));
    let pending = client.initialize().await?;
    if pending > 0 {
        tracing::info!(pending, "offline writes waiting from a previous run");
    }
    let reconnect = client.spawn_reconnect_listener();

    let gate = SessionGate::new(client.sessions().clone());
    let now = chrono::Utc::now();
    let session = match gate.resolve(now).await? {
        StartupRoute::ResumeDiscovery { event, session_id } => Some(CachedSession { event, session_id }),
        StartupRoute::JoinEvent => match std::env::var("MINGLE_EVENT_CODE") {
            Ok(code) => client.join_event(&code, now).await?,
            Err(_) => None,
        },
        route => {
            tracing::info!(?route, "admin flows are handled by the dashboard");
            None
        }
    };

    let Some(session) = session else {
        tracing::info!("no active event session; set MINGLE_EVENT_CODE to join one");
        reachability.abort();
        reconnect.abort();
        return Ok(());
    };

    tracing::info!(event = %session.event.name, "entering discovery");
    client.process_queue().await;

    let handle = SyncService::spawn(client.clone(), session, config.app().poll_interval);
    let mut snapshots = handle.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = snapshots.borrow_and_update().clone();
                tracing::info!(
                    candidates = state.candidates.len(),
                    matches = state.matches.len(),
                    online = state.online,
                    "discovery updated"
                );
            }
        }
    }

    handle.stop().await;
    reachability.abort();
    reconnect.abort();
    Ok(())
}
