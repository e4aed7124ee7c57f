//! Expiration Module
//!
//! The TTL argument accepted by every write operation of the store.

use std::time::Duration;

// == Expiration ==
/// How long a written entry should live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Expiration {
    /// Use the default expiration the cache was created with
    #[default]
    Default,
    /// The entry never expires on its own
    Never,
    /// The entry expires this long after the write; a zero duration never expires
    After(Duration),
}

/// Shorthand for [`Expiration::Default`].
pub const DEFAULT_EXPIRATION: Expiration = Expiration::Default;

/// Shorthand for [`Expiration::Never`].
pub const NO_EXPIRATION: Expiration = Expiration::Never;

impl Expiration {
    /// Resolves this argument against the store's default.
    ///
    /// Returns `None` when the write should never expire.
    pub fn resolve(self, default: Option<Duration>) -> Option<Duration> {
        match self {
            Expiration::Default => default,
            Expiration::Never => None,
            Expiration::After(ttl) if ttl.is_zero() => None,
            Expiration::After(ttl) => Some(ttl),
        }
    }
}

impl From<Duration> for Expiration {
    fn from(ttl: Duration) -> Self {
        Expiration::After(ttl)
    }
}

impl From<Option<Duration>> for Expiration {
    /// `None` maps to [`Expiration::Never`].
    fn from(ttl: Option<Duration>) -> Self {
        ttl.map_or(Expiration::Never, Expiration::After)
    }
}
