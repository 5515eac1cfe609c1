//! Memory Cache Module
//!
//! In-process shadow of the storage engine, keyed by full key.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::cache::{Envelope, ExpirationPolicy, Whitelist};

// == Memory Cache ==
/// Thread-safe map from full key to envelope.
///
/// No eviction beyond explicit deletes and expiry sweeps. Locks are never
/// held across an `.await`.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Envelope>>,
}

impl MemoryCache {
    // == Constructor ==
    /// Creates an empty memory cache.
    pub fn new() -> Self {
        Self::default()
    }

    // == Get ==
    /// Returns a copy of the envelope stored under `key`.
    pub fn get(&self, key: &str) -> Option<Envelope> {
        self.entries.read().get(key).cloned()
    }

    // == Set ==
    /// Stores or overwrites the envelope for `key`.
    pub fn set(&self, key: impl Into<String>, envelope: Envelope) {
        self.entries.write().insert(key.into(), envelope);
    }

    // == Delete ==
    /// Removes `key`, returning the previous envelope.
    pub fn delete(&self, key: &str) -> Option<Envelope> {
        self.entries.write().remove(key)
    }

    // == Keys ==
    /// Returns all full keys currently cached.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    // == Clear ==
    /// Removes every key the whitelist does not protect.
    ///
    /// Returns the number of entries removed.
    pub fn clear_unprotected(&self, whitelist: &Whitelist) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| whitelist.protects(key));
        before - entries.len()
    }

    // == Purge Expired ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self, policy: &ExpirationPolicy) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, envelope| !policy.is_expired(&envelope.expires));
        before - entries.len()
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
