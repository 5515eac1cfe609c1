//! Request Pipeline Module
//!
//! Per-call items and the ordered transforms (`check_key`, `resolve_full_key`,
//! `shape_payload`) applied to them before any I/O happens.

use std::fmt;

use serde_json::Value;

use crate::cache::{Envelope, ExpirationPolicy, KeyNormalizer, SharedFetcher, SyncParams, Ttl};
use crate::error::{Result, StorageError};

// == Load Item ==
/// Options for a single load.
#[derive(Clone)]
pub struct LoadItem {
    /// Logical key (the fetcher-map prefix)
    pub key: String,
    /// Parameters for the fetcher; also part of the storage key
    pub sync_params: SyncParams,
    /// Lifetime used when the fetched result is written back
    pub expires: Option<Ttl>,
    /// Overrides the fetcher registered for `key`
    pub sync_fn: Option<SharedFetcher>,
    /// Extra arguments passed to the fetcher
    pub sync_options: Vec<Value>,
    /// Write successful fetch results back through save
    pub is_auto_save: bool,
    /// Consult the memory cache
    pub is_enable_cache: bool,
    /// Skip every cache layer and fetch
    pub is_force_update: bool,
    /// Uses this storage key instead of deriving one
    pub full_key: Option<String>,
}

impl LoadItem {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            sync_params: SyncParams::new(),
            expires: None,
            sync_fn: None,
            sync_options: Vec::new(),
            is_auto_save: true,
            is_enable_cache: true,
            is_force_update: false,
            full_key: None,
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sync_params.insert(name.into(), value.into());
        self
    }

    pub fn params(mut self, params: SyncParams) -> Self {
        self.sync_params = params;
        self
    }

    pub fn expires(mut self, ttl: Ttl) -> Self {
        self.expires = Some(ttl);
        self
    }

    pub fn sync_fn(mut self, fetcher: SharedFetcher) -> Self {
        self.sync_fn = Some(fetcher);
        self
    }

    pub fn sync_options(mut self, options: Vec<Value>) -> Self {
        self.sync_options = options;
        self
    }

    pub fn auto_save(mut self, enabled: bool) -> Self {
        self.is_auto_save = enabled;
        self
    }

    pub fn enable_cache(mut self, enabled: bool) -> Self {
        self.is_enable_cache = enabled;
        self
    }

    pub fn force_update(mut self, enabled: bool) -> Self {
        self.is_force_update = enabled;
        self
    }

    pub fn full_key(mut self, full_key: impl Into<String>) -> Self {
        self.full_key = Some(full_key.into());
        self
    }
}

impl fmt::Debug for LoadItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadItem")
            .field("key", &self.key)
            .field("sync_params", &self.sync_params)
            .field("expires", &self.expires)
            .field("sync_fn", &self.sync_fn.as_ref().map(|_| "<fetcher>"))
            .field("is_auto_save", &self.is_auto_save)
            .field("is_enable_cache", &self.is_enable_cache)
            .field("is_force_update", &self.is_force_update)
            .field("full_key", &self.full_key)
            .finish()
    }
}

// == Save Item ==
/// Options for a single save.
#[derive(Debug, Clone)]
pub struct SaveItem {
    pub key: String,
    pub data: Value,
    /// Lifetime; falls back to the configured default
    pub expires: Option<Ttl>,
    pub sync_params: SyncParams,
    /// Also write to the memory cache
    pub is_enable_cache: bool,
    /// Uses this storage key instead of deriving one
    pub full_key: Option<String>,
}

impl SaveItem {
    pub fn new(key: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            data: data.into(),
            expires: None,
            sync_params: SyncParams::new(),
            is_enable_cache: true,
            full_key: None,
        }
    }

    pub fn expires(mut self, ttl: Ttl) -> Self {
        self.expires = Some(ttl);
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sync_params.insert(name.into(), value.into());
        self
    }

    pub fn params(mut self, params: SyncParams) -> Self {
        self.sync_params = params;
        self
    }

    pub fn enable_cache(mut self, enabled: bool) -> Self {
        self.is_enable_cache = enabled;
        self
    }

    pub fn full_key(mut self, full_key: impl Into<String>) -> Self {
        self.full_key = Some(full_key.into());
        self
    }
}

// == Remove Key ==
/// Target of a remove: a logical key or an exact storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveKey {
    Prefix(String),
    FullKey(String),
}

impl From<&str> for RemoveKey {
    fn from(key: &str) -> Self {
        RemoveKey::Prefix(key.to_string())
    }
}

impl From<String> for RemoveKey {
    fn from(key: String) -> Self {
        RemoveKey::Prefix(key)
    }
}

// == Prepared Requests ==
/// A load after key checking and normalization.
#[derive(Clone)]
pub(crate) struct PreparedLoad {
    pub full_key: String,
    /// Logical key used to look up the registered fetcher
    pub prefix: String,
    pub sync_params: SyncParams,
    pub expires: Option<Ttl>,
    pub sync_fn: Option<SharedFetcher>,
    pub sync_options: Vec<Value>,
    pub is_auto_save: bool,
    pub is_enable_cache: bool,
    pub is_force_update: bool,
}

/// A save after key checking, normalization and payload shaping.
#[derive(Debug, Clone)]
pub(crate) struct PreparedSave {
    pub full_key: String,
    pub envelope: Envelope,
    pub is_enable_cache: bool,
}

// == Transforms ==
/// Rejects a request that names neither a key nor a full key.
pub(crate) fn check_key(key: &str, full_key: Option<&str>) -> Result<()> {
    let has_full_key = full_key.is_some_and(|k| !k.is_empty());
    if key.is_empty() && !has_full_key {
        return Err(StorageError::InvalidKey(
            "key or full key must be a non-empty string".to_string(),
        ));
    }
    Ok(())
}

/// Returns `(full_key, prefix)` for a request.
pub(crate) fn resolve_full_key(
    normalizer: &KeyNormalizer,
    key: &str,
    params: &SyncParams,
    full_key: Option<&str>,
) -> (String, String) {
    match full_key.filter(|k| !k.is_empty()) {
        Some(full) => {
            let logical = normalizer.logical_key(full);
            let prefix = logical.split('?').next().unwrap_or(logical);
            let prefix = if key.is_empty() { prefix } else { key };
            (full.to_string(), prefix.to_string())
        }
        None => (normalizer.full_key(key, params), key.to_string()),
    }
}

/// Wraps data into the envelope stored for it.
pub(crate) fn shape_payload(
    policy: &ExpirationPolicy,
    data: Value,
    ttl: Ttl,
    now: i64,
) -> Envelope {
    Envelope::new(data, policy.expires_for(ttl, now))
}

// == Pipeline ==
/// The transforms bound to one storage instance's settings.
#[derive(Debug, Clone)]
pub(crate) struct Pipeline {
    pub normalizer: KeyNormalizer,
    pub policy: ExpirationPolicy,
    pub default_expires: u64,
}

impl Pipeline {
    pub fn prepare_load(&self, item: LoadItem) -> Result<PreparedLoad> {
        check_key(&item.key, item.full_key.as_deref())?;
        let (full_key, prefix) = resolve_full_key(
            &self.normalizer,
            &item.key,
            &item.sync_params,
            item.full_key.as_deref(),
        );

        Ok(PreparedLoad {
            full_key,
            prefix,
            sync_params: item.sync_params,
            expires: item.expires,
            sync_fn: item.sync_fn,
            sync_options: item.sync_options,
            is_auto_save: item.is_auto_save,
            is_enable_cache: item.is_enable_cache,
            is_force_update: item.is_force_update,
        })
    }

    pub fn prepare_save(&self, item: SaveItem, now: i64) -> Result<PreparedSave> {
        check_key(&item.key, item.full_key.as_deref())?;
        let (full_key, _) = resolve_full_key(
            &self.normalizer,
            &item.key,
            &item.sync_params,
            item.full_key.as_deref(),
        );
        let ttl = item.expires.unwrap_or(Ttl::Secs(self.default_expires));

        Ok(PreparedSave {
            full_key,
            envelope: shape_payload(&self.policy, item.data, ttl, now),
            is_enable_cache: item.is_enable_cache,
        })
    }

    pub fn prepare_remove(&self, target: RemoveKey) -> Result<String> {
        match target {
            RemoveKey::FullKey(full) => {
                check_key("", Some(&full))?;
                Ok(full)
            }
            RemoveKey::Prefix(key) => {
                check_key(&key, None)?;
                Ok(self.normalizer.full_key(&key, &SyncParams::new()))
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipeline() -> Pipeline {
        Pipeline {
            normalizer: KeyNormalizer::new("P: "),
            policy: ExpirationPolicy::default(),
            default_expires: 30,
        }
    }

    #[test]
    fn test_check_key() {
        assert!(check_key("foo", None).is_ok());
        assert!(check_key("", Some("P: foo")).is_ok());
        assert!(matches!(
            check_key("", None),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            check_key("", Some("")),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_prepare_load_derives_key() {
        let prepared = pipeline()
            .prepare_load(LoadItem::new("user").param("id", 7))
            .unwrap();

        assert_eq!(prepared.full_key, "P: user?id=7");
        assert_eq!(prepared.prefix, "user");
        assert!(prepared.is_auto_save);
        assert!(prepared.is_enable_cache);
        assert!(!prepared.is_force_update);
    }

    #[test]
    fn test_prepare_load_full_key_override() {
        let prepared = pipeline()
            .prepare_load(LoadItem::new("").full_key("P: user?id=7"))
            .unwrap();

        assert_eq!(prepared.full_key, "P: user?id=7");
        assert_eq!(prepared.prefix, "user");
    }

    #[test]
    fn test_prepare_save_uses_default_expires() {
        let now = 1_000;
        let prepared = pipeline()
            .prepare_save(SaveItem::new("foo", json!({"x": 1})), now)
            .unwrap();

        assert_eq!(prepared.full_key, "P: foo");
        assert_eq!(prepared.envelope.raw_data, json!({"x": 1}));
        assert_eq!(prepared.envelope.expires, json!(1_030));
    }

    #[test]
    fn test_prepare_save_never_expires() {
        let prepared = pipeline()
            .prepare_save(SaveItem::new("foo", 1).expires(Ttl::Never), 1_000)
            .unwrap();

        assert_eq!(prepared.envelope.expires, Value::Null);
    }

    #[test]
    fn test_prepare_save_rejects_empty_key() {
        let result = pipeline().prepare_save(SaveItem::new("", 1), 0);
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn test_prepare_remove() {
        let pipeline = pipeline();

        assert_eq!(pipeline.prepare_remove("foo".into()).unwrap(), "P: foo");
        assert_eq!(
            pipeline
                .prepare_remove(RemoveKey::FullKey("P: foo?a=1".to_string()))
                .unwrap(),
            "P: foo?a=1"
        );
        assert!(pipeline.prepare_remove("".into()).is_err());
    }
}
