//! Mingle - Main Library
//!
//! Mingle lets attendees of a time-boxed event (a party, a conference, a
//! wedding) create an ephemeral profile, discover compatible attendees,
//! like them, and chat once the interest is mutual. Everything is scoped to
//! one event and expires with it.
//!
//! # Module Structure
//!
//! - **`shared`** - Platform-agnostic records and rules
//!   - Events, profiles, likes, messages and their validation
//!   - Configuration and shared error types
//!
//! - **`client`** - The device-side core
//!   - Remote document store boundary with structured error kinds
//!   - Retry executor with exponential backoff and jitter
//!   - Durable offline operation queue over local SQLite storage
//!   - Compatibility filter and mutual-like detection
//!   - Session gate deciding where the app opens
//!   - Discovery coordinator polling the store on a fixed interval
//!
//! # Usage
//!
//! ```rust,no_run
//! use mingle::client::local_db::LocalDatabase;
//! use mingle::client::store::RestStore;
//! use mingle::client::{Config, MingleClient, NetworkMonitor};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let storage = Arc::new(LocalDatabase::new().await?);
//! let store = Arc::new(RestStore::new(config.server_url()));
//! let client = Arc::new(MingleClient::new(store, storage, NetworkMonitor::online(), &config));
//! client.initialize().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - `shared::SharedError` for validation and serialization
//! - `client::StoreError` with a `StoreErrorKind` tag deciding retry policy
//! - `client::CoreError` aggregating both plus local storage failures

/// Shared types and data structures
pub mod shared;

/// Device-side data access, matching and sync
pub mod client;
