//! Storage Cache - An expiring key-value cache over pluggable storage engines
//!
//! Serves reads from memory, the storage engine or a registered fetcher,
//! runs at most one fetch per key at a time, and sweeps expired entries in
//! the background.

pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{LoadItem, RemoveKey, SaveItem, Storage, StorageBuilder, Ttl};
pub use config::{Config, StorageConfig};
pub use engine::{AsyncEngine, MemoryEngine, StorageEngine, SyncEngine};
pub use error::{Result, StorageError};
