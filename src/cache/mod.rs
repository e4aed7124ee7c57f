//! Cache Module
//!
//! Provides an in-process key/value cache with per-entry TTL expiration,
//! eviction notification and background sweeping.

mod entry;
mod expiration;
mod handle;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::Entry;
pub use expiration::{Expiration, DEFAULT_EXPIRATION, NO_EXPIRATION};
pub use handle::Cache;
pub use store::{EvictionCallback, Store};
