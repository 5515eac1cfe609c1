//! Storage Module
//!
//! The caching engine: decides for every read whether to serve memory, the
//! storage engine or a fetcher, and writes fetched data back.

use std::sync::Arc;

use futures::future::{self, join_all, try_join_all, BoxFuture};
use futures::FutureExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::entry::current_timestamp_secs;
use crate::cache::pipeline::{Pipeline, PreparedLoad, PreparedSave};
use crate::cache::{
    Envelope, ExpirationPolicy, Fetcher, FetchResult, KeyNormalizer, LoadItem, MemoryCache,
    RemoveKey, SaveItem, SharedFetcher, SyncFnMap, SyncParams, TaskRegistry, Ttl, Whitelist,
};
use crate::config::StorageConfig;
use crate::engine::{EngineInfo, EngineKind, StorageEngine};
use crate::error::{Result, StorageError};
use crate::tasks::{spawn_sweeper, sweep_expired, SweepReport};

// == Storage Core ==
/// State shared by the public handle, in-flight fetch tasks and the sweeper.
pub(crate) struct StorageCore {
    pub pipeline: Pipeline,
    pub memory: MemoryCache,
    pub engine: StorageEngine,
    pub tasks: TaskRegistry<FetchResult>,
    pub sync_fn_map: SyncFnMap,
    pub white_list: Whitelist,
}

impl StorageCore {
    // == Save Path ==
    /// Writes the envelope to the memory cache, if enabled for this save.
    fn commit(&self, save: &PreparedSave) {
        if save.is_enable_cache {
            self.memory.set(save.full_key.clone(), save.envelope.clone());
        }
    }

    /// Writes the envelope to the storage engine.
    async fn persist(&self, save: &PreparedSave) -> Result<()> {
        let text = save.envelope.to_json()?;
        self.engine.set_item(&save.full_key, &text).await
    }

    async fn save(&self, save: PreparedSave) -> Result<()> {
        self.commit(&save);
        self.persist(&save).await
    }

    // == Load Path ==
    async fn find(self: &Arc<Self>, load: PreparedLoad) -> Result<Value> {
        if load.is_force_update {
            debug!(key = %load.full_key, "Force update, bypassing cache");
            return self.fetch(load).await;
        }

        let cached = match self.memory_hit(&load) {
            Some(envelope) => Some(envelope),
            None => self.read_engine(&load.full_key).await,
        };

        match cached {
            Some(envelope) if !self.pipeline.policy.is_expired(&envelope.expires) => {
                debug!(key = %load.full_key, "Cache hit");
                Ok(envelope.raw_data)
            }
            Some(_) => {
                debug!(key = %load.full_key, "Cached entry expired");
                self.fetch(load).await
            }
            None => {
                debug!(key = %load.full_key, "Cache miss");
                self.fetch(load).await
            }
        }
    }

    fn memory_hit(&self, load: &PreparedLoad) -> Option<Envelope> {
        if load.is_enable_cache {
            self.memory.get(&load.full_key)
        } else {
            None
        }
    }

    /// Reads an envelope from the engine; absence, read errors and
    /// malformed values all count as no cached data.
    async fn read_engine(&self, key: &str) -> Option<Envelope> {
        match self.engine.get_item(key).await {
            Ok(Some(text)) => {
                let envelope = Envelope::parse(&text);
                if envelope.is_none() {
                    debug!(key, "Stored value is not an envelope, treating as absent");
                }
                envelope
            }
            Ok(None) => None,
            Err(err) => {
                debug!(key, error = %err, "Engine read failed, treating as absent");
                None
            }
        }
    }

    fn resolve_fetcher(&self, load: &PreparedLoad) -> Option<SharedFetcher> {
        load.sync_fn
            .clone()
            .or_else(|| self.sync_fn_map.get(&load.prefix).cloned())
    }

    async fn fetch(self: &Arc<Self>, load: PreparedLoad) -> Result<Value> {
        let Some(fetcher) = self.resolve_fetcher(&load) else {
            return Err(StorageError::no_fetcher(load.full_key));
        };

        let core = Arc::clone(self);
        let full_key = load.full_key.clone();
        let expires = load.expires;
        let is_auto_save = load.is_auto_save;

        let task = self.tasks.acquire(
            &load.full_key,
            || {
                debug!(key = %load.full_key, "Starting fetch");
                let pending = fetcher.fetch(&load.sync_params, &load.sync_options);
                async move {
                    pending
                        .await
                        .map(FetchResult::normalize)
                        .map_err(|err| StorageError::Fetch(format!("{:#}", err)))
                }
            },
            move |outcome| match outcome {
                Ok(result) if result.is_success() && is_auto_save => {
                    core.write_back(&full_key, expires, result)
                }
                Ok(result) => {
                    debug!(key = %full_key, code = result.code, "Fetched result not saved");
                    future::ready(()).boxed()
                }
                Err(err) => {
                    warn!(key = %full_key, error = %err, "Fetch failed");
                    future::ready(()).boxed()
                }
            },
        );

        task.await.map(FetchResult::into_value)
    }

    /// Saves a fetched result under its logical key.
    ///
    /// The memory cache is updated before this returns. The returned future
    /// performs the engine write; its failures are only logged.
    fn write_back(
        self: &Arc<Self>,
        full_key: &str,
        expires: Option<Ttl>,
        result: &FetchResult,
    ) -> BoxFuture<'static, ()> {
        let mut item = SaveItem::new(
            self.pipeline.normalizer.logical_key(full_key),
            result.clone().into_value(),
        );
        item.expires = expires;

        let save = match self.pipeline.prepare_save(item, current_timestamp_secs()) {
            Ok(save) => save,
            Err(err) => {
                error!(key = %full_key, error = %err, "Write-back failed");
                return future::ready(()).boxed();
            }
        };

        self.commit(&save);
        let core = Arc::clone(self);
        async move {
            if let Err(err) = core.persist(&save).await {
                error!(key = %save.full_key, error = %err, "Write-back failed");
            }
        }
        .boxed()
    }
}

// == Storage ==
/// Key-value cache in front of a pluggable storage engine.
///
/// Dropping the handle stops the background sweeper.
pub struct Storage {
    core: Arc<StorageCore>,
    sweeper: Option<JoinHandle<()>>,
}

impl Storage {
    // == Constructors ==
    /// Starts building a storage with default configuration.
    pub fn builder() -> StorageBuilder {
        StorageBuilder::default()
    }

    /// Creates a storage from configuration and an engine, with no fetchers.
    pub fn new(config: StorageConfig, engine: StorageEngine) -> Self {
        Self::builder().config(config).engine(engine).build()
    }

    // == Save ==
    /// Saves one item to the memory cache and the engine.
    pub async fn save(&self, item: SaveItem) -> Result<()> {
        let save = self
            .core
            .pipeline
            .prepare_save(item, current_timestamp_secs())?;
        self.core.save(save).await
    }

    /// Saves a sequence of items; every key is checked before any write.
    ///
    /// Every write runs to completion; the first failure is returned.
    pub async fn save_many(&self, items: Vec<SaveItem>) -> Result<()> {
        let now = current_timestamp_secs();
        let saves = items
            .into_iter()
            .map(|item| self.core.pipeline.prepare_save(item, now))
            .collect::<Result<Vec<_>>>()?;

        join_all(saves.into_iter().map(|save| self.core.save(save)))
            .await
            .into_iter()
            .collect()
    }

    /// Saves one item through the engine's blocking interface.
    ///
    /// If the engine write fails, the memory cache entry for the key is
    /// removed before the error is returned.
    pub fn save_sync(&self, item: SaveItem) -> Result<()> {
        let save = self
            .core
            .pipeline
            .prepare_save(item, current_timestamp_secs())?;
        let text = save.envelope.to_json()?;

        self.core.commit(&save);
        if let Err(err) = self.core.engine.set_item_sync(&save.full_key, &text) {
            self.core.memory.delete(&save.full_key);
            return Err(err);
        }
        Ok(())
    }

    // == Load ==
    /// Loads one item, fetching it when it is missing or expired.
    ///
    /// Returns the cached data, or `{code, data}` for a fetched result.
    pub async fn load(&self, item: LoadItem) -> Result<Value> {
        let load = self.core.pipeline.prepare_load(item)?;
        self.core.find(load).await
    }

    /// Loads a sequence of items; every key is checked before any read.
    pub async fn load_many(&self, items: Vec<LoadItem>) -> Result<Vec<Value>> {
        let loads = items
            .into_iter()
            .map(|item| self.core.pipeline.prepare_load(item))
            .collect::<Result<Vec<_>>>()?;

        try_join_all(loads.into_iter().map(|load| self.core.find(load))).await
    }

    /// Reads one item from memory or the engine's blocking interface.
    ///
    /// Never fetches. Returns `None` when the item is absent or expired.
    pub fn load_sync(&self, item: LoadItem) -> Result<Option<Value>> {
        let load = self.core.pipeline.prepare_load(item)?;

        let cached = match self.core.memory_hit(&load) {
            Some(envelope) => Some(envelope),
            None => match self.core.engine.get_item_sync(&load.full_key) {
                Ok(text) => text.as_deref().and_then(Envelope::parse),
                Err(err @ StorageError::Unsupported(_)) => return Err(err),
                Err(err) => {
                    debug!(key = %load.full_key, error = %err, "Engine read failed, treating as absent");
                    None
                }
            },
        };

        Ok(cached
            .filter(|envelope| !self.core.pipeline.policy.is_expired(&envelope.expires))
            .map(|envelope| envelope.raw_data))
    }

    // == Remove ==
    /// Removes one item from the memory cache, then from the engine.
    pub async fn remove(&self, target: impl Into<RemoveKey>) -> Result<()> {
        let full_key = self.core.pipeline.prepare_remove(target.into())?;
        self.core.memory.delete(&full_key);
        self.core.engine.remove_item(&full_key).await
    }

    /// Removes a sequence of items; every key is checked before any removal.
    pub async fn remove_many(&self, targets: Vec<RemoveKey>) -> Result<()> {
        let full_keys = targets
            .into_iter()
            .map(|target| self.core.pipeline.prepare_remove(target))
            .collect::<Result<Vec<_>>>()?;

        for full_key in &full_keys {
            self.core.memory.delete(full_key);
        }
        join_all(full_keys.iter().map(|key| self.core.engine.remove_item(key)))
            .await
            .into_iter()
            .collect()
    }

    /// Blocking counterpart of [`Storage::remove`].
    pub fn remove_sync(&self, target: impl Into<RemoveKey>) -> Result<()> {
        let full_key = self.core.pipeline.prepare_remove(target.into())?;
        self.core.memory.delete(&full_key);
        self.core.engine.remove_item_sync(&full_key)
    }

    // == Clear ==
    /// Removes everything not protected by `white_list` or the configured
    /// whitelist, from memory first and then from the engine.
    pub async fn clear(&self, white_list: &[String]) -> Result<()> {
        let merged = self.core.white_list.merged(white_list);
        let from_memory = self.core.memory.clear_unprotected(&merged);
        let from_engine = self.core.engine.clear(&merged).await?;

        info!(from_memory, from_engine, "Storage cleared");
        Ok(())
    }

    /// Blocking counterpart of [`Storage::clear`].
    pub fn clear_sync(&self, white_list: &[String]) -> Result<()> {
        let merged = self.core.white_list.merged(white_list);
        let from_memory = self.core.memory.clear_unprotected(&merged);
        let from_engine = self.core.engine.clear_sync(&merged)?;

        info!(from_memory, from_engine, "Storage cleared");
        Ok(())
    }

    // == Info ==
    /// Lists the keys held by the engine, or by the memory cache when no
    /// engine is configured.
    pub async fn info(&self) -> Result<EngineInfo> {
        match self.core.engine.kind() {
            EngineKind::None => Ok(self.memory_info()),
            _ => self.core.engine.info().await,
        }
    }

    /// Blocking counterpart of [`Storage::info`].
    pub fn info_sync(&self) -> Result<EngineInfo> {
        match self.core.engine.kind() {
            EngineKind::None => Ok(self.memory_info()),
            _ => self.core.engine.info_sync(),
        }
    }

    fn memory_info(&self) -> EngineInfo {
        EngineInfo {
            keys: self.core.memory.keys(),
        }
    }

    // == Sweep ==
    /// Runs one expiry sweep immediately.
    pub async fn sweep_expired(&self) -> SweepReport {
        sweep_expired(&self.core).await
    }

    // == Introspection ==
    /// Derives the full storage key for a logical key and parameters.
    pub fn full_key(&self, key: &str, params: &SyncParams) -> String {
        self.core.pipeline.normalizer.full_key(key, params)
    }

    /// Returns the full keys held in the memory cache.
    pub fn cached_keys(&self) -> Vec<String> {
        self.core.memory.keys()
    }

    /// Returns the number of fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.core.tasks.in_flight()
    }

    /// Returns the capability set of the configured engine.
    pub fn engine_kind(&self) -> EngineKind {
        self.core.engine.kind()
    }

    /// Returns true while the background sweeper is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

// == Storage Builder ==
/// Collects configuration, the engine and registered fetchers.
#[derive(Default)]
pub struct StorageBuilder {
    config: StorageConfig,
    engine: StorageEngine,
    sync_fn_map: SyncFnMap,
}

impl StorageBuilder {
    pub fn config(mut self, config: StorageConfig) -> Self {
        self.config = config;
        self
    }

    pub fn engine(mut self, engine: StorageEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Registers the fetcher used for loads of logical key `prefix`.
    pub fn sync_fn<F: Fetcher + 'static>(self, prefix: impl Into<String>, fetcher: F) -> Self {
        self.shared_sync_fn(prefix, Arc::new(fetcher))
    }

    pub fn shared_sync_fn(mut self, prefix: impl Into<String>, fetcher: SharedFetcher) -> Self {
        self.sync_fn_map.insert(prefix.into(), fetcher);
        self
    }

    /// Builds the storage and, if enabled, starts the sweeper.
    ///
    /// Without an engine the storage runs memory-only.
    pub fn build(self) -> Storage {
        let StorageBuilder {
            config,
            engine,
            sync_fn_map,
        } = self;

        if engine.kind() == EngineKind::None {
            warn!("No storage engine configured, falling back to memory-only storage");
        }

        let core = Arc::new(StorageCore {
            pipeline: Pipeline {
                normalizer: KeyNormalizer::new(config.storage_key_prefix.clone()),
                policy: ExpirationPolicy::new(config.never_expire_mark.clone()),
                default_expires: config.default_expires,
            },
            memory: MemoryCache::new(),
            engine,
            tasks: TaskRegistry::new(),
            sync_fn_map,
            white_list: Whitelist::new(config.white_list.clone()),
        });

        let sweeper = if config.is_enable_auto_clear {
            spawn_sweeper(Arc::clone(&core), config.auto_clear_time)
        } else {
            None
        };

        info!(
            engine = %core.engine.kind(),
            prefix = %config.storage_key_prefix,
            default_expires = config.default_expires,
            "Storage initialized"
        );

        Storage { core, sweeper }
    }
}
