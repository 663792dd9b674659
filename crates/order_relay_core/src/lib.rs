//! Order relay domain primitives.
//!
//! This crate owns the order/envelope contracts, the declarative routing
//! profiles, and object key derivation. It intentionally excludes AWS SDK and
//! Lambda runtime concerns so every rule here is testable without fakes.

pub mod contract;
pub mod error;
pub mod routing;
pub mod storage_keys;

pub use error::{RelayError, RelayResult};
