//! Storage Engine Module
//!
//! Capability traits for pluggable backends and the uniform facade the
//! cache calls through.
//!
//! Engines store envelopes as JSON text. An engine is classified once, at
//! construction, by the capability set it implements:
//! - `Sync` - blocking get/set/remove/keys (localStorage-like)
//! - `Async` - the same set as futures (AsyncStorage-like)
//! - `Hybrid` - both sets on one backend (mini-program-like)
//! - `None` - no engine; the cache runs memory-only

mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;

use crate::cache::Whitelist;
use crate::error::{Result, StorageError};

pub use memory::MemoryEngine;

// == Capability Traits ==
/// Blocking storage backend.
pub trait SyncEngine: Send + Sync {
    /// Returns the stored text, or `None` when the key is absent.
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
    /// Lists every key held by the backend.
    fn keys(&self) -> Result<Vec<String>>;
}

/// Asynchronous storage backend.
#[async_trait]
pub trait AsyncEngine: Send + Sync {
    /// Returns the stored text, or `None` when the key is absent.
    async fn get_item(&self, key: &str) -> Result<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;
    async fn remove_item(&self, key: &str) -> Result<()>;
    /// Lists every key held by the backend.
    async fn keys(&self) -> Result<Vec<String>>;
}

// == Engine Kind ==
/// Which capability set a configured engine provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    LocalStorageLike,
    AsyncStorageLike,
    MiniProgramLike,
    None,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineKind::LocalStorageLike => "localStorage-like",
            EngineKind::AsyncStorageLike => "AsyncStorage-like",
            EngineKind::MiniProgramLike => "mini-program-like",
            EngineKind::None => "none",
        };
        f.write_str(name)
    }
}

// == Engine Info ==
/// Snapshot of what the engine holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineInfo {
    pub keys: Vec<String>,
}

// == Storage Engine ==
/// A configured backend, tagged by capability set.
#[derive(Clone, Default)]
pub enum StorageEngine {
    Sync(Arc<dyn SyncEngine>),
    Async(Arc<dyn AsyncEngine>),
    Hybrid(Arc<dyn SyncEngine>, Arc<dyn AsyncEngine>),
    #[default]
    None,
}

impl StorageEngine {
    // == Constructors ==
    /// Wraps a blocking backend.
    pub fn sync<E: SyncEngine + 'static>(engine: E) -> Self {
        StorageEngine::Sync(Arc::new(engine))
    }

    /// Wraps an asynchronous backend.
    pub fn asynchronous<E: AsyncEngine + 'static>(engine: E) -> Self {
        StorageEngine::Async(Arc::new(engine))
    }

    /// Wraps a backend implementing both capability sets.
    pub fn hybrid<E: SyncEngine + AsyncEngine + 'static>(engine: E) -> Self {
        let engine = Arc::new(engine);
        StorageEngine::Hybrid(engine.clone(), engine)
    }

    /// Returns the capability set of this engine.
    pub fn kind(&self) -> EngineKind {
        match self {
            StorageEngine::Sync(_) => EngineKind::LocalStorageLike,
            StorageEngine::Async(_) => EngineKind::AsyncStorageLike,
            StorageEngine::Hybrid(..) => EngineKind::MiniProgramLike,
            StorageEngine::None => EngineKind::None,
        }
    }

    // == Async Facade ==
    pub async fn get_item(&self, key: &str) -> Result<Option<String>> {
        match self {
            StorageEngine::Sync(engine) => engine.get_item(key),
            StorageEngine::Async(engine) | StorageEngine::Hybrid(_, engine) => {
                engine.get_item(key).await
            }
            StorageEngine::None => Ok(None),
        }
    }

    pub async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        match self {
            StorageEngine::Sync(engine) => engine.set_item(key, value),
            StorageEngine::Async(engine) | StorageEngine::Hybrid(_, engine) => {
                engine.set_item(key, value).await
            }
            StorageEngine::None => Ok(()),
        }
    }

    pub async fn remove_item(&self, key: &str) -> Result<()> {
        match self {
            StorageEngine::Sync(engine) => engine.remove_item(key),
            StorageEngine::Async(engine) | StorageEngine::Hybrid(_, engine) => {
                engine.remove_item(key).await
            }
            StorageEngine::None => Ok(()),
        }
    }

    pub async fn keys(&self) -> Result<Vec<String>> {
        match self {
            StorageEngine::Sync(engine) => engine.keys(),
            StorageEngine::Async(engine) | StorageEngine::Hybrid(_, engine) => {
                engine.keys().await
            }
            StorageEngine::None => Ok(Vec::new()),
        }
    }

    /// Removes every key the whitelist does not protect.
    ///
    /// Removals are issued concurrently and all run to completion; the
    /// first failure is returned.
    pub async fn clear(&self, whitelist: &Whitelist) -> Result<usize> {
        let doomed = whitelist.unprotected(self.keys().await?);
        let count = doomed.len();

        join_all(doomed.iter().map(|key| self.remove_item(key)))
            .await
            .into_iter()
            .collect::<Result<()>>()?;
        Ok(count)
    }

    pub async fn info(&self) -> Result<EngineInfo> {
        Ok(EngineInfo {
            keys: self.keys().await?,
        })
    }

    // == Sync Facade ==
    fn blocking(&self) -> Result<Option<&Arc<dyn SyncEngine>>> {
        match self {
            StorageEngine::Sync(engine) | StorageEngine::Hybrid(engine, _) => Ok(Some(engine)),
            StorageEngine::Async(_) => Err(StorageError::Unsupported(format!(
                "synchronous access to a {} engine",
                self.kind()
            ))),
            StorageEngine::None => Ok(None),
        }
    }

    pub fn get_item_sync(&self, key: &str) -> Result<Option<String>> {
        match self.blocking()? {
            Some(engine) => engine.get_item(key),
            None => Ok(None),
        }
    }

    pub fn set_item_sync(&self, key: &str, value: &str) -> Result<()> {
        match self.blocking()? {
            Some(engine) => engine.set_item(key, value),
            None => Ok(()),
        }
    }

    pub fn remove_item_sync(&self, key: &str) -> Result<()> {
        match self.blocking()? {
            Some(engine) => engine.remove_item(key),
            None => Ok(()),
        }
    }

    pub fn keys_sync(&self) -> Result<Vec<String>> {
        match self.blocking()? {
            Some(engine) => engine.keys(),
            None => Ok(Vec::new()),
        }
    }

    /// Blocking counterpart of [`StorageEngine::clear`].
    pub fn clear_sync(&self, whitelist: &Whitelist) -> Result<usize> {
        let doomed = whitelist.unprotected(self.keys_sync()?);
        for key in &doomed {
            self.remove_item_sync(key)?;
        }
        Ok(doomed.len())
    }

    pub fn info_sync(&self) -> Result<EngineInfo> {
        Ok(EngineInfo {
            keys: self.keys_sync()?,
        })
    }
}

impl fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StorageEngine").field(&self.kind()).finish()
    }
}
