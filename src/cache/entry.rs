//! Envelope Module
//!
//! Defines the wrapper every stored value travels in.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// == Envelope ==
/// A stored value together with its expiry.
///
/// `expires` is a Unix timestamp in seconds or the configured never-expire
/// mark. Missing fields deserialize to `null` so foreign shapes stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// The caller's data
    #[serde(default)]
    pub raw_data: Value,
    /// Expiry timestamp (Unix seconds) or the never-expire mark
    #[serde(default)]
    pub expires: Value,
}

impl Envelope {
    // == Constructor ==
    /// Creates a new envelope.
    pub fn new(raw_data: Value, expires: Value) -> Self {
        Self { raw_data, expires }
    }

    // == Encoding ==
    /// Serializes the envelope into the text form handed to storage engines.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses an envelope from its stored text form.
    ///
    /// Returns `None` for anything that is not an envelope-shaped object.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in seconds.
pub fn current_timestamp_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
