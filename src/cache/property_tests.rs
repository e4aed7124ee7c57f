//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store against a plain HashMap model.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use crate::cache::{Expiration, Store, DEFAULT_EXPIRATION, NO_EXPIRATION};
use crate::error::CacheError;

// == Test Configuration ==
const TEST_DEFAULT_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
/// Generates keys from a small alphabet so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}"
}

fn ttl_strategy() -> impl Strategy<Value = Expiration> {
    prop_oneof![
        Just(DEFAULT_EXPIRATION),
        Just(NO_EXPIRATION),
        Just(Expiration::After(Duration::ZERO)),
        (60u64..3600).prop_map(|secs| Expiration::After(Duration::from_secs(secs))),
    ]
}

/// A cache operation applied to both the store and the model
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: u32, ttl: Expiration },
    Add { key: String, value: u32, ttl: Expiration },
    Replace { key: String, value: u32, ttl: Expiration },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), any::<u32>(), ttl_strategy())
            .prop_map(|(key, value, ttl)| CacheOp::Set { key, value, ttl }),
        (key_strategy(), any::<u32>(), ttl_strategy())
            .prop_map(|(key, value, ttl)| CacheOp::Add { key, value, ttl }),
        (key_strategy(), any::<u32>(), ttl_strategy())
            .prop_map(|(key, value, ttl)| CacheOp::Replace { key, value, ttl }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

fn recording_store() -> (Store<String, u32>, Arc<Mutex<Vec<(String, u32)>>>) {
    let store = Store::new(TEST_DEFAULT_TTL);
    let evicted = Arc::new(Mutex::new(Vec::new()));
    let sink = evicted.clone();
    store.on_evicted(move |key, value| sink.lock().unwrap().push((key, value)));
    (store, evicted)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Without expirations in play the store behaves exactly like a map,
    // and only `delete` of a present key reports an eviction.
    #[test]
    fn prop_store_matches_map_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let (store, evicted) = recording_store();
        let mut model: HashMap<String, u32> = HashMap::new();
        let mut expected_evictions = Vec::new();

        for op in ops {
            match op {
                CacheOp::Set { key, value, ttl } => {
                    store.set(key.clone(), value, ttl);
                    model.insert(key, value);
                }
                CacheOp::Add { key, value, ttl } => {
                    let result = store.add(key.clone(), value, ttl);
                    if model.contains_key(&key) {
                        prop_assert_eq!(result, Err(CacheError::AlreadyExists));
                    } else {
                        prop_assert_eq!(result, Ok(()));
                        model.insert(key, value);
                    }
                }
                CacheOp::Replace { key, value, ttl } => {
                    let result = store.replace(key.clone(), value, ttl);
                    if model.contains_key(&key) {
                        prop_assert_eq!(result, Ok(()));
                        model.insert(key, value);
                    } else {
                        prop_assert_eq!(result, Err(CacheError::NotFound));
                    }
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(store.get(&key), model.get(&key).copied());
                }
                CacheOp::Delete { key } => {
                    store.delete(&key);
                    if let Some(value) = model.remove(&key) {
                        expected_evictions.push((key, value));
                    }
                }
            }
            prop_assert_eq!(store.item_count(), model.len());
        }

        prop_assert_eq!(&*evicted.lock().unwrap(), &expected_evictions);
    }

    // Flushing reports each live entry exactly once with its last value.
    #[test]
    fn prop_flush_evicts_every_live_entry_once(
        entries in prop::collection::vec((key_strategy(), any::<u32>()), 0..30)
    ) {
        let (store, evicted) = recording_store();
        let mut model = HashMap::new();
        for (key, value) in entries {
            store.set(key.clone(), value, NO_EXPIRATION);
            model.insert(key, value);
        }

        store.flush();

        prop_assert_eq!(store.item_count(), 0);
        let evicted: HashMap<String, u32> = evicted.lock().unwrap().iter().cloned().collect();
        prop_assert_eq!(evicted.len(), model.len(), "one callback per live key");
        prop_assert_eq!(evicted, model);
    }

    // The loader only runs for keys without a live entry.
    #[test]
    fn prop_get_or_load_runs_loader_once_per_key(
        keys in prop::collection::vec(key_strategy(), 1..40)
    ) {
        let store: Store<String, usize> = Store::new(TEST_DEFAULT_TTL);
        let mut loads: HashMap<String, usize> = HashMap::new();

        for key in keys {
            let value: Result<usize, ()> = store.get_or_load(key.clone(), |key| {
                *loads.entry(key.clone()).or_default() += 1;
                Ok((key.len(), DEFAULT_EXPIRATION))
            });
            prop_assert_eq!(value, Ok(key.len()));
        }

        prop_assert!(loads.values().all(|&count| count == 1));
        prop_assert_eq!(store.item_count(), loads.len());
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // An entry is visible before its TTL elapses and absent after, while
    // never-expiring neighbours are unaffected.
    #[test]
    fn prop_ttl_expiration_behavior(key in key_strategy(), value in any::<u32>()) {
        let store = Store::new(TEST_DEFAULT_TTL);
        let keeper = format!("{key}-keeper");

        store.set(key.clone(), value, Expiration::After(Duration::from_millis(40)));
        store.set(keeper.clone(), value, NO_EXPIRATION);

        prop_assert_eq!(store.get(&key), Some(value), "entry should exist before TTL expires");

        sleep(Duration::from_millis(70));

        prop_assert_eq!(store.get(&key), None, "entry should be absent after TTL expires");
        prop_assert_eq!(store.get(&keeper), Some(value));
        prop_assert_eq!(store.delete_expired(), 1);
        prop_assert_eq!(store.item_count(), 1);
    }
}
