//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Errors returned by the conditional write operations of the cache.
///
/// Reads never fail: absence of a key is reported through `Option`.
/// Loader errors from `get_or_load` are returned as-is and never wrapped here.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    /// `add` was called on a key that still holds a live entry
    #[error("item already exists")]
    AlreadyExists,

    /// `replace` was called on a key without a live entry
    #[error("item not found")]
    NotFound,
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
