//! Client Error Types
//!
//! [`CoreError`] is what every directory, matcher and queue operation returns.
//! It keeps the store's structured kind intact so callers can tell
//! connectivity problems (retried, then queued) from permanent ones
//! (surfaced immediately).

use crate::client::local_db::LocalStorageError;
use crate::client::store::{StoreError, StoreErrorKind};
use crate::shared::SharedError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Remote store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Domain validation or rule violation
    #[error(transparent)]
    Shared(#[from] SharedError),

    /// Device-local storage failure
    #[error(transparent)]
    Local(#[from] LocalStorageError),
}

impl CoreError {
    /// Store kind, if the error came from the remote store
    pub fn store_kind(&self) -> Option<StoreErrorKind> {
        match self {
            CoreError::Store(err) => Some(err.kind),
            _ => None,
        }
    }

    /// Whether the failure is a reachability problem worth deferring
    pub fn is_connectivity(&self) -> bool {
        self.store_kind().is_some_and(StoreErrorKind::is_connectivity)
    }

    /// Whether retrying can never help
    pub fn is_permanent(&self) -> bool {
        match self {
            CoreError::Store(err) => !err.is_transient(),
            CoreError::Shared(_) => true,
            CoreError::Local(_) => false,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Shared(err.into())
    }
}
