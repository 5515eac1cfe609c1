//! Expiry Sweeper Task
//!
//! Background task that periodically removes expired entries from the
//! memory cache and the storage engine.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::storage::StorageCore;
use crate::cache::Envelope;
use crate::error::Result;

// == Sweep Report ==
/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Expired entries removed from the memory cache
    pub memory_removed: usize,
    /// Expired entries removed from the engine
    pub backend_removed: usize,
    /// Engine keys whose read or removal failed
    pub failed: usize,
}

/// Runs one sweep pass.
///
/// The memory cache is purged synchronously. Engine keys are then checked
/// concurrently; values that do not parse as envelopes are left alone and a
/// failure on one key does not stop the others.
pub(crate) async fn sweep_expired(core: &StorageCore) -> SweepReport {
    let memory_removed = core.memory.purge_expired(&core.pipeline.policy);

    let keys = match core.engine.keys().await {
        Ok(keys) => keys,
        Err(err) => {
            warn!(error = %err, "Expiry sweep could not list engine keys");
            return SweepReport {
                memory_removed,
                backend_removed: 0,
                failed: 1,
            };
        }
    };

    let outcomes = join_all(keys.iter().map(|key| sweep_key(core, key))).await;

    let mut report = SweepReport {
        memory_removed,
        ..SweepReport::default()
    };
    for (key, outcome) in keys.iter().zip(outcomes) {
        match outcome {
            Ok(true) => report.backend_removed += 1,
            Ok(false) => {}
            Err(err) => {
                debug!(key, error = %err, "Expiry sweep skipped key");
                report.failed += 1;
            }
        }
    }
    report
}

/// Removes `key` from the engine if it holds an expired envelope.
async fn sweep_key(core: &StorageCore, key: &str) -> Result<bool> {
    let Some(text) = core.engine.get_item(key).await? else {
        return Ok(false);
    };
    let Some(envelope) = Envelope::parse(&text) else {
        return Ok(false);
    };
    if !core.pipeline.policy.is_expired(&envelope.expires) {
        return Ok(false);
    }

    core.engine.remove_item(key).await?;
    Ok(true)
}

/// Spawns a background task that sweeps expired entries.
///
/// The first pass runs as soon as the task is scheduled, then every
/// `interval_secs` seconds (at least one). Returns `None` when called
/// outside a tokio runtime.
///
/// # Example
/// ```ignore
/// let handle = spawn_sweeper(core.clone(), 60);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub(crate) fn spawn_sweeper(core: Arc<StorageCore>, interval_secs: u64) -> Option<JoinHandle<()>> {
    let runtime = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            warn!("No tokio runtime available, expiry sweeper not started");
            return None;
        }
    };
    let interval = Duration::from_secs(interval_secs.max(1));

    Some(runtime.spawn(async move {
        info!(
            "Starting expiry sweeper with interval of {} seconds",
            interval.as_secs()
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let report = sweep_expired(&core).await;

            if report.memory_removed + report.backend_removed > 0 {
                info!(
                    "Expiry sweep: removed {} memory and {} engine entries",
                    report.memory_removed, report.backend_removed
                );
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    }))
}
