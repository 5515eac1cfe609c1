//! Cache Module
//!
//! Provides the expiring read-through/write-through cache with fetch
//! deduplication.

mod entry;
mod expiry;
mod fetch;
mod keys;
mod memory;
pub(crate) mod pipeline;
mod registry;
pub(crate) mod storage;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_secs, Envelope};
pub use expiry::{ExpirationPolicy, Ttl};
pub use fetch::{FetchFuture, FetchResult, Fetcher, SharedFetcher, SyncFnMap};
pub use keys::{query_string, KeyNormalizer, SyncParams, Whitelist};
pub use memory::MemoryCache;
pub use pipeline::{LoadItem, RemoveKey, SaveItem};
pub use registry::{TaskFuture, TaskRegistry};
pub use storage::{Storage, StorageBuilder};
