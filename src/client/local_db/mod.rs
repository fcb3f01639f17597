//! # Local Database Module
//!
//! Durable device-local key/value storage. Holds the cached session
//! (event and session identifiers, admin flag), the saved profile draft, and
//! the offline operation queue.
//!
//! ## Key Components
//!
//! - [`LocalStorage`]: the get/set/remove/multi-remove contract the core uses
//! - [`LocalDatabase`]: SQLite implementation over an `sqlx` pool
//! - [`MemoryStorage`]: shared in-memory implementation for tests
//! - `schema.rs`: schema statements and migration bookkeeping
//! - `kv.rs`: key/value operations and JSON helpers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mingle::client::local_db::{LocalDatabase, LocalStorage};
//!
//! # async fn example() -> Result<(), mingle::client::local_db::LocalStorageError> {
//! let db = LocalDatabase::new().await?;
//! db.set("mingle.session_id", "4f0c...").await?;
//! let session = db.get("mingle.session_id").await?;
//! # Ok(())
//! # }
//! ```

pub mod kv;
pub mod memory;
pub mod schema;

pub use kv::{get_json, set_json};
pub use memory::MemoryStorage;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors from local storage
#[derive(Debug, Error)]
pub enum LocalStorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for local storage operations
pub type Result<T> = std::result::Result<T, LocalStorageError>;

/// Device-local durable key/value storage
#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    async fn multi_remove(&self, keys: &[&str]) -> Result<()>;
}

/// SQLite-backed local storage
#[derive(Debug, Clone)]
pub struct LocalDatabase {
    pool: SqlitePool,
}

impl LocalDatabase {
    /// Open or create the local database in the platform data directory
    pub async fn new() -> Result<Self> {
        Self::open_at(&Self::default_path()).await
    }

    /// Open or create a database at an explicit path
    ///
    /// Uses WAL mode so readers never block the queue writer.
    pub async fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!(path = %path.display(), "opening local database");

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Open a private in-memory database
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // Every connection to :memory: is a separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Platform-specific path of the default database file
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        path.push("mingle");
        path.push("local.db");
        path
    }

    /// Create tables and apply pending migrations
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(schema::CREATE_MIGRATIONS_TABLE)
            .execute(&self.pool)
            .await?;

        let current_version: (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;

        for version in schema::get_pending_migrations(current_version.0) {
            for statement in schema::migration_statements(version) {
                sqlx::query(statement).execute(&self.pool).await?;
            }
            sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
                .bind(version)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&self.pool)
                .await?;
            tracing::debug!(version, "applied local schema migration");
        }

        Ok(())
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Current schema version
    pub async fn schema_version(&self) -> Result<i64> {
        let version: (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;
        Ok(version.0)
    }
}
