//! Integration test utilities for the gateway client
//!
//! Provides a scripted mock of the platform's REST discovery endpoint and WebSocket
//! gateway so the full client can be driven end to end on localhost.

pub mod helpers;

pub use helpers::*;
