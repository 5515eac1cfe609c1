//! Expiration Policy Module
//!
//! Decides whether an envelope's `expires` value has passed.

use serde_json::Value;

use crate::cache::entry::current_timestamp_secs;

// == TTL ==
/// Lifetime requested for a saved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Expires this many seconds after the save
    Secs(u64),
    /// Stored with the never-expire mark
    Never,
}

// == Expiration Policy ==
/// Expiry rules parameterized by the never-expire mark.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpirationPolicy {
    never_expire_mark: Value,
}

impl ExpirationPolicy {
    /// Creates a policy with the given never-expire mark.
    pub fn new(never_expire_mark: Value) -> Self {
        Self { never_expire_mark }
    }

    // == Is Expired ==
    /// Checks `expires` against the current time.
    pub fn is_expired(&self, expires: &Value) -> bool {
        self.is_expired_at(expires, current_timestamp_secs())
    }

    /// Checks `expires` against `now` (Unix seconds).
    ///
    /// Boundary condition: an entry expires strictly after its timestamp, so
    /// `expires == now` is still fresh. Values that are neither the mark nor
    /// a recognizable timestamp are never expired.
    pub fn is_expired_at(&self, expires: &Value, now: i64) -> bool {
        if *expires == self.never_expire_mark {
            return false;
        }

        match timestamp_of(expires) {
            Some(ts) => ts < now as f64,
            None => false,
        }
    }

    // == Expiry For TTL ==
    /// Computes the `expires` value to store for a TTL saved at `now`.
    ///
    /// Lifetimes past the representable range saturate at `i64::MAX`.
    pub fn expires_for(&self, ttl: Ttl, now: i64) -> Value {
        match ttl {
            Ttl::Secs(secs) => {
                let secs = i64::try_from(secs).unwrap_or(i64::MAX);
                Value::from(now.saturating_add(secs))
            }
            Ttl::Never => self.never_expire_mark.clone(),
        }
    }
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

/// Reads a timestamp out of a number or a numeric string.
fn timestamp_of(expires: &Value) -> Option<f64> {
    let ts = match expires {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    ts.filter(|ts| !ts.is_nan())
}
