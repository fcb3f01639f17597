//! Integration tests across the client core

mod match_flow_test;
mod offline_queue_test;
mod rest_store_test;
mod session_gate_test;
