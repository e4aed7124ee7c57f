//! Cache Handle Module
//!
//! The object handed to callers: a shared store plus the lifecycle of its
//! background sweeper.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, error};

use crate::cache::{Entry, Store};
use crate::config::Config;
use crate::tasks::Sweeper;

// == Cache ==
/// An in-process TTL cache.
///
/// Dereferences to [`Store`], so every cache operation is called directly on
/// the handle. When created with a non-zero cleanup interval the handle also
/// owns a [`Sweeper`] that purges expired entries in the background.
///
/// Call [`Cache::shutdown`] when done with the cache. Dropping the handle
/// also signals the sweeper, but only as a fallback.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ttl_cache::{Cache, DEFAULT_EXPIRATION};
///
/// let mut cache = Cache::new(Duration::from_secs(300), Duration::from_secs(60));
/// cache.set("a", 1, DEFAULT_EXPIRATION);
/// assert_eq!(cache.get("a"), Some(1));
/// cache.shutdown();
/// ```
#[derive(Debug)]
pub struct Cache<K, V> {
    store: Arc<Store<K, V>>,
    sweeper: Option<Sweeper>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates an empty cache.
    ///
    /// # Arguments
    /// * `default_expiration` - TTL for writes using the default; zero means never expire
    /// * `cleanup_interval` - Period between background sweeps; zero disables the
    ///   sweeper and expired entries stay until [`Store::delete_expired`] is called
    ///
    /// The sweeper runs on its own thread, independent of any tokio runtime
    /// the caller may be inside.
    pub fn new(default_expiration: Duration, cleanup_interval: Duration) -> Self {
        Self::new_from(default_expiration, cleanup_interval, HashMap::new())
    }

    /// Creates a cache on top of an existing map of entries.
    ///
    /// The map is moved into the store and only reachable through the cache
    /// afterwards.
    pub fn new_from(
        default_expiration: Duration,
        cleanup_interval: Duration,
        items: HashMap<K, Entry<V>>,
    ) -> Self {
        let store = Arc::new(Store::with_items(default_expiration, items));
        let sweeper = start_sweeper(&store, cleanup_interval, None);
        Self { store, sweeper }
    }

    /// Creates an empty cache whose sweeper runs as a task on `runtime`.
    ///
    /// The sweeper stops, with a warning, if `runtime` shuts down before the
    /// cache; only use this with a runtime that outlives the cache.
    pub fn new_on(
        runtime: &Handle,
        default_expiration: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        let store = Arc::new(Store::new(default_expiration));
        let sweeper = start_sweeper(&store, cleanup_interval, Some(runtime));
        Self { store, sweeper }
    }

    /// Creates an empty cache from a loaded [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_ttl, config.cleanup_interval)
    }
}

impl<K, V> Cache<K, V> {
    /// The shared store, for handing to other threads or eviction callbacks.
    pub fn store(&self) -> &Arc<Store<K, V>> {
        &self.store
    }

    /// The background sweeper, if one was started.
    pub fn sweeper(&self) -> Option<&Sweeper> {
        self.sweeper.as_ref()
    }

    // == Shutdown ==
    /// Stops the background sweeper.
    ///
    /// Idempotent. The store stays usable afterwards but expired entries are
    /// only removed by explicit calls to [`Store::delete_expired`].
    pub fn shutdown(&mut self) {
        if let Some(sweeper) = self.sweeper.as_mut() {
            if sweeper.stop() {
                debug!(interval = ?sweeper.interval(), "cache sweeper shut down");
            }
        }
    }
}

fn start_sweeper<K, V>(
    store: &Arc<Store<K, V>>,
    interval: Duration,
    runtime: Option<&Handle>,
) -> Option<Sweeper>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    if interval.is_zero() {
        return None;
    }
    let started = match runtime {
        Some(runtime) => Sweeper::start_on(store.clone(), interval, runtime),
        None => Sweeper::start(store.clone(), interval),
    };
    match started {
        Ok(sweeper) => Some(sweeper),
        Err(err) => {
            error!(%err, "cannot start cache sweeper, expired entries must be deleted manually");
            None
        }
    }
}

impl<K, V> Deref for Cache<K, V> {
    type Target = Store<K, V>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
