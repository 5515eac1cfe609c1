//! Request DTOs for the storage API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{LoadItem, SaveItem, SyncParams, Ttl};

/// Request body for the save operation (PUT /items)
///
/// # Fields
/// - `key`: Logical key to save under
/// - `data`: The value to store
/// - `expires`: Optional TTL in seconds (uses default if not specified)
/// - `neverExpire`: Store with the never-expire mark instead of a TTL
/// - `syncParams`: Parameters folded into the storage key
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub key: String,
    pub data: Value,
    #[serde(default)]
    pub expires: Option<u64>,
    #[serde(default)]
    pub never_expire: bool,
    #[serde(default)]
    pub sync_params: SyncParams,
}

impl SaveRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.never_expire && self.expires.is_some() {
            return Some("expires and neverExpire are mutually exclusive".to_string());
        }
        None
    }

    /// Converts into a storage save item.
    pub fn into_item(self) -> SaveItem {
        let mut item = SaveItem::new(self.key, self.data).params(self.sync_params);
        item.expires = match (self.never_expire, self.expires) {
            (true, _) => Some(Ttl::Never),
            (false, secs) => secs.map(Ttl::Secs),
        };
        item
    }
}

/// Request body for the load operation (POST /load)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRequest {
    pub key: String,
    #[serde(default)]
    pub sync_params: SyncParams,
    /// TTL in seconds for the written-back result
    #[serde(default)]
    pub expires: Option<u64>,
    #[serde(default = "default_true")]
    pub is_auto_save: bool,
    #[serde(default = "default_true")]
    pub is_enable_cache: bool,
    #[serde(default)]
    pub is_force_update: bool,
}

impl LoadRequest {
    /// Converts into a storage load item.
    pub fn into_item(self) -> LoadItem {
        let mut item = LoadItem::new(self.key)
            .params(self.sync_params)
            .auto_save(self.is_auto_save)
            .enable_cache(self.is_enable_cache)
            .force_update(self.is_force_update);
        item.expires = self.expires.map(Ttl::Secs);
        item
    }
}

/// Request body for the clear operation (POST /clear)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearRequest {
    /// Substrings protecting keys from this clear
    #[serde(default)]
    pub white_list: Vec<String>,
}

fn default_true() -> bool {
    true
}
