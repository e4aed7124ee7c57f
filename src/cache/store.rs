//! Cache Store Module
//!
//! Main cache engine: a HashMap of entries behind a single reader/writer lock,
//! with TTL expiration and eviction notification.
//!
//! # Locking
//! `get`, `item_count` and `items` take the shared lock. Every other
//! operation takes the exclusive lock for its whole check-then-act sequence.
//! Eviction callbacks always run after the lock is released.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::mem;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::cache::{Entry, Expiration};
use crate::error::{CacheError, Result};

/// Callback invoked with the key and value of every evicted entry.
pub type EvictionCallback<K, V> = Arc<dyn Fn(K, V) + Send + Sync>;

/// Pairs removed under the lock, notified after it is released.
type Evicted<K, V> = Vec<(K, V)>;

struct Inner<K, V> {
    items: HashMap<K, Entry<V>>,
    on_evicted: Option<EvictionCallback<K, V>>,
}

impl<K: Eq + Hash, V> Inner<K, V> {
    /// Looks up an entry, treating expired ones as absent.
    fn live<Q>(&self, key: &Q) -> Option<&Entry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.get(key).filter(|entry| !entry.is_expired())
    }

    fn live_mut<Q>(&mut self, key: &Q) -> Option<&mut Entry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.get_mut(key).filter(|entry| !entry.is_expired())
    }
}

// == Store ==
/// Thread-safe key/value store with per-entry expiration.
///
/// Keys can be any `Eq + Hash` type and values any type; reads hand back
/// clones of the stored value.
pub struct Store<K, V> {
    inner: RwLock<Inner<K, V>>,
    /// Normalized default TTL, None = never expire
    default_expiration: Option<Duration>,
}

impl<K: Eq + Hash, V> Store<K, V> {
    // == Constructors ==
    /// Creates an empty store.
    ///
    /// A zero `default_expiration` means writes using [`Expiration::Default`]
    /// never expire.
    pub fn new(default_expiration: Duration) -> Self {
        Self::with_items(default_expiration, HashMap::new())
    }

    /// Creates a store that takes ownership of a pre-built map of entries.
    ///
    /// Useful to pre-size the map or to start from previously snapshotted
    /// entries. Expired entries in `items` are kept until swept.
    pub fn with_items(default_expiration: Duration, items: HashMap<K, Entry<V>>) -> Self {
        let default_expiration = Some(default_expiration).filter(|ttl| !ttl.is_zero());
        Self {
            inner: RwLock::new(Inner {
                items,
                on_evicted: None,
            }),
            default_expiration,
        }
    }

    /// The TTL applied by [`Expiration::Default`], None if it never expires.
    pub fn default_expiration(&self) -> Option<Duration> {
        self.default_expiration
    }

    // The map is only mutated after every fallible step, so a panic while
    // holding the lock leaves it consistent and poisoning can be ignored.
    fn read(&self) -> RwLockReadGuard<'_, Inner<K, V>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<K, V>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, ttl: Expiration) -> Option<Duration> {
        ttl.resolve(self.default_expiration)
    }

    // == Set ==
    /// Stores a value, replacing any existing entry for `key`.
    ///
    /// Overwriting is not an eviction: the eviction callback is not invoked.
    pub fn set(&self, key: K, value: V, ttl: Expiration) {
        let entry = Entry::new(value, self.resolve(ttl));
        let previous = self.write().items.insert(key, entry);
        drop(previous);
    }

    // == Add ==
    /// Stores a value only if `key` has no live entry.
    ///
    /// Fails with [`CacheError::AlreadyExists`] otherwise, leaving the
    /// existing entry untouched. An expired entry is replaced silently.
    pub fn add(&self, key: K, value: V, ttl: Expiration) -> Result<()> {
        let ttl = self.resolve(ttl);
        let mut inner = self.write();
        if inner.live(&key).is_some() {
            return Err(CacheError::AlreadyExists);
        }
        let previous = inner.items.insert(key, Entry::new(value, ttl));
        drop(inner);
        drop(previous);
        Ok(())
    }

    // == Replace ==
    /// Stores a value only if `key` already has a live entry.
    ///
    /// Fails with [`CacheError::NotFound`] otherwise, without inserting.
    pub fn replace(&self, key: K, value: V, ttl: Expiration) -> Result<()> {
        let ttl = self.resolve(ttl);
        let mut inner = self.write();
        let Some(entry) = inner.live_mut(&key) else {
            return Err(CacheError::NotFound);
        };
        let previous = mem::replace(entry, Entry::new(value, ttl));
        drop(inner);
        drop(previous);
        Ok(())
    }

    // == Delete ==
    /// Removes the entry for `key`, expired or not.
    ///
    /// The eviction callback, if any, is invoked after the lock is released.
    /// Does nothing if the key is absent.
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (removed, callback) = {
            let mut inner = self.write();
            let removed = inner.items.remove_entry(key);
            (removed, inner.on_evicted.clone())
        };

        if let (Some((key, entry)), Some(callback)) = (removed, callback) {
            callback(key, entry.value);
        }
    }

    // == On Evicted ==
    /// Registers the callback invoked with every entry removed by `delete`,
    /// `flush` or an expiration sweep, replacing any previous one.
    ///
    /// The callback runs outside the store lock and may call back into the
    /// store. A callback that captures an `Arc` of this store keeps it alive;
    /// capture a `Weak` instead.
    pub fn on_evicted<F>(&self, callback: F)
    where
        F: Fn(K, V) + Send + Sync + 'static,
    {
        self.write().on_evicted = Some(Arc::new(callback));
    }

    /// Disables eviction notification for subsequent removals.
    pub fn clear_on_evicted(&self) {
        self.write().on_evicted = None;
    }

    // == Item Count ==
    /// Returns the number of entries in the map.
    ///
    /// This includes expired entries that have not been swept yet, so it is
    /// not a count of live items.
    pub fn item_count(&self) -> usize {
        self.read().items.len()
    }

    // == Flush ==
    /// Removes every entry.
    ///
    /// Entries still live at flush time are reported to the eviction callback
    /// after the lock is released; already expired ones are dropped silently.
    pub fn flush(&self) {
        let (items, callback, now) = {
            let mut inner = self.write();
            let items = mem::take(&mut inner.items);
            (items, inner.on_evicted.clone(), Instant::now())
        };
        debug!(removed = items.len(), "flushed cache");

        if let Some(callback) = callback {
            for (key, entry) in items {
                if !entry.is_expired_at(now) {
                    callback(key, entry.value);
                }
            }
        }
    }
}

impl<K: Eq + Hash, V: Clone> Store<K, V> {
    // == Get ==
    /// Returns a clone of the value for `key` if it has a live entry.
    ///
    /// Expired entries read as absent even before they are swept.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read().live(key).map(|entry| entry.value.clone())
    }

    // == Get And Extend ==
    /// Like [`Store::get`], additionally re-stamping the entry to expire
    /// `ttl` from now.
    ///
    /// A `ttl` resolving to never-expire leaves the current expiration as is.
    pub fn get_and_extend<Q>(&self, key: &Q, ttl: Expiration) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let ttl = self.resolve(ttl);
        let mut inner = self.write();
        let entry = inner.live_mut(key)?;
        if let Some(ttl) = ttl {
            entry.extend(ttl);
        }
        Some(entry.value.clone())
    }

    // == Get Or Load ==
    /// Returns the live value for `key`, or computes it with `loader`.
    ///
    /// On a miss `loader` is called exactly once; its value is stored with
    /// the TTL it returns and handed back. A loader error is returned as-is
    /// and nothing is stored.
    ///
    /// # Locking
    /// The loader runs while the exclusive lock is held. Every other caller,
    /// whatever the key, waits for it to finish, and a loader that calls back
    /// into this store deadlocks. Keep loaders short and self-contained.
    pub fn get_or_load<F, E>(&self, key: K, loader: F) -> std::result::Result<V, E>
    where
        F: FnOnce(&K) -> std::result::Result<(V, Expiration), E>,
    {
        let mut inner = self.write();
        if let Some(entry) = inner.live(&key) {
            return Ok(entry.value.clone());
        }
        self.load_into(&mut inner, key, loader)
    }

    // == Get And Extend Or Load ==
    /// Union of [`Store::get_and_extend`] and [`Store::get_or_load`] in a
    /// single critical section.
    ///
    /// `ttl` is resolved first and only applies to the extension of a live
    /// entry; a loaded value uses the TTL returned by the loader. The same
    /// locking contract as `get_or_load` applies.
    pub fn get_and_extend_or_load<F, E>(
        &self,
        key: K,
        ttl: Expiration,
        loader: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce(&K) -> std::result::Result<(V, Expiration), E>,
    {
        let ttl = self.resolve(ttl);
        let mut inner = self.write();
        if let Some(entry) = inner.live_mut(&key) {
            if let Some(ttl) = ttl {
                entry.extend(ttl);
            }
            return Ok(entry.value.clone());
        }
        self.load_into(&mut inner, key, loader)
    }

    fn load_into<F, E>(
        &self,
        inner: &mut Inner<K, V>,
        key: K,
        loader: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce(&K) -> std::result::Result<(V, Expiration), E>,
    {
        let (value, ttl) = loader(&key)?;
        let entry = Entry::new(value.clone(), self.resolve(ttl));
        inner.items.insert(key, entry);
        Ok(value)
    }
}

impl<K: Eq + Hash + Clone, V> Store<K, V> {
    // == Delete Expired ==
    /// Removes every expired entry and returns how many were removed.
    ///
    /// Removed pairs are collected under the lock and handed to the eviction
    /// callback, in no particular order, once it is released.
    pub fn delete_expired(&self) -> usize {
        let now = Instant::now();
        let (evicted, callback) = {
            let mut inner = self.write();
            match inner.on_evicted.clone() {
                None => {
                    let before = inner.items.len();
                    inner.items.retain(|_, entry| !entry.is_expired_at(now));
                    return before - inner.items.len();
                }
                Some(callback) => {
                    let expired: Vec<K> = inner
                        .items
                        .iter()
                        .filter(|(_, entry)| entry.is_expired_at(now))
                        .map(|(key, _)| key.clone())
                        .collect();
                    let evicted: Evicted<K, V> = expired
                        .iter()
                        .filter_map(|key| inner.items.remove_entry(key))
                        .map(|(key, entry)| (key, entry.value))
                        .collect();
                    (evicted, callback)
                }
            }
        };

        let removed = evicted.len();
        for (key, value) in evicted {
            callback(key, value);
        }
        removed
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Store<K, V> {
    // == Items ==
    /// Returns a snapshot of every live entry.
    pub fn items(&self) -> HashMap<K, Entry<V>> {
        let now = Instant::now();
        self.read()
            .items
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }
}

impl<K, V> fmt::Debug for Store<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Store")
            .field("item_count", &inner.items.len())
            .field("default_expiration", &self.default_expiration)
            .field("on_evicted", &inner.on_evicted.is_some())
            .finish()
    }
}
