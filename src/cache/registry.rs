//! In-Flight Task Registry Module
//!
//! Coalesces concurrent fetches for the same key into one shared task.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{Result, StorageError};

/// A pending fetch outcome every joined caller can await.
pub type TaskFuture<T> = Shared<BoxFuture<'static, Result<T>>>;

type TaskMap<T> = Arc<Mutex<HashMap<String, TaskFuture<T>>>>;

// == Task Registry ==
/// At most one live task per key.
///
/// The fetch runs in its own tokio task, so it settles even if every caller
/// stops waiting. Deregistration happens as soon as the fetch settles and
/// before the `on_settled` hook runs; callers see the outcome only once the
/// hook's future has completed.
pub struct TaskRegistry<T> {
    tasks: TaskMap<T>,
}

impl<T> TaskRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // == Acquire ==
    /// Joins the task registered for `key`, or starts one with `factory`.
    ///
    /// `on_settled` runs once, inside the task, after deregistration. Its
    /// future is awaited before any caller observes the outcome.
    pub fn acquire<F, Fut, S, H>(&self, key: &str, factory: F, on_settled: S) -> TaskFuture<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        S: FnOnce(&Result<T>) -> H + Send + 'static,
        H: Future<Output = ()> + Send + 'static,
    {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(err) => {
                let err = StorageError::FetchProtocol(format!(
                    "fetch for '{}' needs a tokio runtime: {}",
                    key, err
                ));
                return future::ready(Err(err)).boxed().shared();
            }
        };

        let (tx, rx) = oneshot::channel::<Result<T>>();
        let owned_key = key.to_string();
        let task: TaskFuture<T> = async move {
            rx.await.unwrap_or_else(|_| {
                Err(StorageError::FetchProtocol(format!(
                    "fetch for '{}' did not settle into a result",
                    owned_key
                )))
            })
        }
        .boxed()
        .shared();

        {
            let mut tasks = self.tasks.lock();
            if let Some(existing) = tasks.get(key) {
                debug!(key, "Joining in-flight fetch");
                return existing.clone();
            }
            tasks.insert(key.to_string(), task.clone());
        }

        // Deregisters on drop, so a panicking fetch is cleaned up too.
        let guard = Deregister {
            tasks: Arc::clone(&self.tasks),
            key: key.to_string(),
        };

        let fetch = factory();
        runtime.spawn(async move {
            let outcome = fetch.await;
            drop(guard);
            on_settled(&outcome).await;
            let _ = tx.send(outcome);
        });

        task
    }

    // == Introspection ==
    /// Returns true if a task is registered for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.tasks.lock().contains_key(key)
    }

    /// Returns the number of live tasks.
    pub fn in_flight(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl<T> Default for TaskRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

struct Deregister<T> {
    tasks: TaskMap<T>,
    key: String,
}

impl<T> Drop for Deregister<T> {
    fn drop(&mut self) {
        self.tasks.lock().remove(&self.key);
    }
}
