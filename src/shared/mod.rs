//! Shared Module
//!
//! Platform-agnostic domain types: the event-scoped records exchanged with the
//! remote document store, their validation rules, and configuration.
//!
//! # Overview
//!
//! Every record here is plain data that serializes to the JSON documents kept
//! in the `events`, `event_profiles`, `likes` and `messages` collections.

/// Event data structure
pub mod event;

/// Attendee profiles
pub mod profile;

/// Directed likes
pub mod like;

/// Chat messages between matches
pub mod message;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::SharedError;
pub use event::Event;
pub use like::{Like, NewLike};
pub use message::{Message, NewMessage};
pub use profile::{GenderIdentity, InterestedIn, NewProfile, Profile, ProfilePatch};
