//! # Retry Executor
//!
//! Wraps every remote call with a connectivity check, bounded retries and
//! exponential backoff with jitter.
//!
//! ## Features
//!
//! - **Connectivity Gate**: An offline device counts as a failed attempt
//!   without touching the store
//! - **Exponential Backoff**: `base * 2^(attempt - 1)` between attempts
//! - **Jitter**: Uniform random delay on top to avoid a thundering herd
//! - **Classification**: Permanent error kinds are rethrown on the first
//!   failure
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mingle::client::offline::retry::{RetryExecutor, RetryPolicy};
//! use mingle::client::sync::NetworkMonitor;
//!
//! # async fn example(store: &dyn mingle::client::store::DocumentStore) {
//! let executor = RetryExecutor::new(RetryPolicy::default(), NetworkMonitor::online());
//! let event = executor
//!     .execute("get_event", || store.get("events", "evt-1"))
//!     .await;
//! # }
//! ```

use crate::client::store::StoreError;
use crate::client::sync::NetworkMonitor;
use crate::shared::config::{
    AppConfig, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_JITTER_MS, DEFAULT_MAX_RETRIES,
};
use rand::Rng;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Backoff configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first
    pub max_retries: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Upper bound (exclusive) of the random jitter
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_jitter: Duration::from_millis(DEFAULT_MAX_JITTER_MS),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay,
            max_jitter: config.max_jitter,
        }
    }

    /// Deterministic part of the delay after failed attempt `attempt` (1-indexed)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Backoff plus random jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        };
        self.backoff(attempt) + jitter
    }
}

/// Lifetime counters for observability
#[derive(Debug, Default)]
struct Counters {
    attempts: AtomicU64,
    retries: AtomicU64,
    permanent_failures: AtomicU64,
    exhausted: AtomicU64,
}

/// Snapshot of [`RetryExecutor`] counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryStats {
    /// Attempts made, including those skipped for being offline
    pub attempts: u64,
    /// Attempts that were followed by a backoff
    pub retries: u64,
    /// Calls that failed with a permanent error
    pub permanent_failures: u64,
    /// Calls that ran out of attempts
    pub exhausted: u64,
}

/// Runs remote operations under a [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    network: NetworkMonitor,
    counters: Arc<Counters>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, network: NetworkMonitor) -> Self {
        Self {
            policy,
            network,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    /// The error of the last attempt is returned.
    pub async fn execute<T, F, Fut>(&self, name: &str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let max_attempts = self.policy.max_retries.max(1);
        let mut attempt = 1;

        loop {
            self.counters.attempts.fetch_add(1, Ordering::Relaxed);

            let result = if self.network.is_online() {
                op().await
            } else {
                Err(StoreError::connectivity("network unreachable"))
            };

            let err = match result {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(operation = name, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_transient() {
                self.counters.permanent_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(operation = name, attempt, error = %err, "permanent failure, not retrying");
                return Err(err);
            }

            if attempt >= max_attempts {
                self.counters.exhausted.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(operation = name, attempts = attempt, error = %err, "retries exhausted");
                return Err(err);
            }

            let delay = self.policy.delay_for(attempt);
            self.counters.retries.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                operation = name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient failure, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    pub fn get_stats(&self) -> RetryStats {
        RetryStats {
            attempts: self.counters.attempts.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
            permanent_failures: self.counters.permanent_failures.load(Ordering::Relaxed),
            exhausted: self.counters.exhausted.load(Ordering::Relaxed),
        }
    }
}
