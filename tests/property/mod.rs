//! Property-based tests

mod filter_proptest;
mod like_proptest;
