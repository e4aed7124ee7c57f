//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A stored value together with the instant it stops being live.
///
/// Instants come from `tokio::time`, so a paused test clock applies to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    /// The stored value
    pub value: V,
    /// Expiration instant, None = no expiration
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    // == Constructors ==
    /// Creates an entry that expires `ttl` from now, or never if `ttl` is None.
    pub fn new(value: V, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.and_then(deadline),
        }
    }

    /// Creates an entry that never expires.
    pub fn never(value: V) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates an entry expiring at an absolute instant.
    pub fn expiring_at(value: V, expires_at: Instant) -> Self {
        Self {
            value,
            expires_at: Some(expires_at),
        }
    }

    /// The instant this entry expires, None if it never does.
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is strictly past its
    /// expiration instant. Entries without one never expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Same as [`Entry::is_expired`] against a caller-supplied `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(expires) if now > expires)
    }

    // == Time To Live ==
    /// Returns the remaining time to live, or None if no expiration is set.
    ///
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has a TTL that hasn't elapsed
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }

    /// Re-stamps the expiration to `ttl` from now.
    pub(crate) fn extend(&mut self, ttl: Duration) {
        self.expires_at = deadline(ttl);
    }
}

/// Instant `ttl` from now; a TTL too large to represent never expires.
fn deadline(ttl: Duration) -> Option<Instant> {
    Instant::now().checked_add(ttl)
}
