//! Memory Engine
//!
//! A process-local backend implementing both capability sets.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{AsyncEngine, SyncEngine};
use crate::error::Result;

// == Memory Engine ==
/// HashMap-backed storage engine.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl SyncEngine for MemoryEngine {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().keys().cloned().collect())
    }
}

#[async_trait]
impl AsyncEngine for MemoryEngine {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        SyncEngine::get_item(self, key)
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        SyncEngine::set_item(self, key, value)
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        SyncEngine::remove_item(self, key)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        SyncEngine::keys(self)
    }
}
