//! # Discovery and Matching
//!
//! - `filter.rs`: the bidirectional compatibility filter that builds a
//!   candidate pool from the visible profiles of an event
//! - `matcher.rs`: like handling and mutual-match detection

pub mod filter;
pub mod matcher;

pub use filter::{candidate_pool, is_candidate, orientation_compatible, DiscoveryFilters, GenderFilter};
pub use matcher::{LikeOutcome, MatchDetector};
