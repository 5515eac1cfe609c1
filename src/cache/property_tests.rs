//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify key normalization, expiry and whitelist properties.

use proptest::prelude::*;
use serde_json::{json, Value};

use crate::cache::{Envelope, ExpirationPolicy, KeyNormalizer, MemoryCache, SyncParams, Whitelist};

// == Test Configuration ==
const TEST_PREFIX: &str = "PROP: ";

// == Strategies ==
/// Generates valid logical keys
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_/]{1,32}".prop_map(|s| s)
}

/// Generates a parameter list with unique names, paired with a shuffled copy
fn shuffled_params_strategy() -> impl Strategy<Value = (Vec<(String, i64)>, Vec<(String, i64)>)> {
    prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..8)
        .prop_map(|map| map.into_iter().collect::<Vec<_>>())
        .prop_flat_map(|pairs| (Just(pairs.clone()), Just(pairs).prop_shuffle()))
}

/// Builds parameters by inserting pairs in the given order
fn params_from(pairs: &[(String, i64)]) -> SyncParams {
    let mut params = SyncParams::new();
    for (name, value) in pairs {
        params.insert(name.clone(), json!(value));
    }
    params
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Normalizing the same key and parameter set yields the same full key
    // no matter what order the parameters were supplied in.
    #[test]
    fn prop_full_key_ignores_param_order(
        key in valid_key_strategy(),
        (sorted, shuffled) in shuffled_params_strategy()
    ) {
        let normalizer = KeyNormalizer::new(TEST_PREFIX);

        let from_sorted = normalizer.full_key(&key, &params_from(&sorted));
        let from_shuffled = normalizer.full_key(&key, &params_from(&shuffled));
        prop_assert_eq!(&from_sorted, &from_shuffled);

        // names appear in sorted order whatever order they were inserted in
        if !sorted.is_empty() {
            let query = from_shuffled.split_once('?').map(|(_, q)| q).unwrap_or("");
            let names: Vec<&str> = query
                .split('&')
                .filter_map(|pair| pair.split_once('=').map(|(name, _)| name))
                .collect();
            let expected: Vec<&str> = sorted.iter().map(|(name, _)| name.as_str()).collect();
            prop_assert_eq!(names, expected);
        }
    }

    // Re-normalizing a full key never adds a second prefix.
    #[test]
    fn prop_full_key_is_idempotent(key in valid_key_strategy()) {
        let normalizer = KeyNormalizer::new(TEST_PREFIX);
        let once = normalizer.full_key(&key, &SyncParams::new());
        let twice = normalizer.full_key(&once, &SyncParams::new());

        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(normalizer.logical_key(&once), key.as_str());
    }

    // Entries one second in the past are expired, one second ahead are not,
    // and the never-expire mark holds for any clock value.
    #[test]
    fn prop_expiration_boundary(now in -1_000_000_000i64..4_000_000_000i64) {
        let policy = ExpirationPolicy::default();

        prop_assert!(policy.is_expired_at(&json!(now - 1), now));
        prop_assert!(!policy.is_expired_at(&json!(now + 1), now));
        prop_assert!(!policy.is_expired_at(&Value::Null, now));
    }

    // Clearing removes exactly the keys no whitelist pattern protects.
    #[test]
    fn prop_clear_respects_whitelist(
        keys in prop::collection::hash_set("[a-c][0-9]", 0..20),
        pattern in "[a-c]"
    ) {
        let cache = MemoryCache::new();
        for key in &keys {
            cache.set(key.clone(), Envelope::new(json!(1), Value::Null));
        }

        let whitelist = Whitelist::new(vec![pattern.clone()]);
        cache.clear_unprotected(&whitelist);

        for key in &keys {
            let kept = cache.get(key).is_some();
            prop_assert_eq!(kept, key.contains(pattern.as_str()), "key {}", key);
        }
    }
}
