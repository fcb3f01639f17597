//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Fixtures for events, profile drafts and wired-up clients
//! - Mock document API helpers
//! - Custom assertion macros

pub mod assertions;
pub mod fixtures;
pub mod mock_server;

pub use fixtures::*;
pub use mock_server::*;
