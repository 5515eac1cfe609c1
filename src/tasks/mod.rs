//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a storage is alive.
//!
//! # Tasks
//! - Expiry Sweeper: Removes expired entries at the configured interval

mod sweeper;

pub use sweeper::SweepReport;
pub(crate) use sweeper::{spawn_sweeper, sweep_expired};
