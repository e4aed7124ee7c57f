//! TTL Cache - An in-process key/value cache with expiration
//!
//! Augments a plain map with per-entry time-to-live, an optional eviction
//! callback and a background sweeper that purges expired entries.
//!
//! Expired entries read as absent as soon as they expire but keep occupying
//! memory until the sweeper (or [`Store::delete_expired`]) removes them.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, Entry, Expiration, Store, DEFAULT_EXPIRATION, NO_EXPIRATION};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::Sweeper;
