//! AWS-oriented adapters and handlers for the order relay functions.
//!
//! This crate owns runtime integration details (Lambda handlers, capability
//! adapters, environment configuration, and log setup). Domain rules live in
//! `order_relay_core`; every handler here takes its capabilities as explicit
//! parameters so the AWS clients can be swapped for in-memory fakes.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod telemetry;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
