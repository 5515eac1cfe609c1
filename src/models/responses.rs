//! Response DTOs for the storage API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::engine::EngineKind;

/// Response body for the load operations (GET /items/:key, POST /load)
#[derive(Debug, Clone, Serialize)]
pub struct LoadResponse {
    /// The requested key
    pub key: String,
    /// Cached data, or `{code, data}` for a fetched result
    pub data: Value,
}

impl LoadResponse {
    /// Creates a new LoadResponse
    pub fn new(key: impl Into<String>, data: Value) -> Self {
        Self {
            key: key.into(),
            data,
        }
    }
}

/// Response body for the save operation (PUT /items)
#[derive(Debug, Clone, Serialize)]
pub struct SaveResponse {
    /// Success message
    pub message: String,
    /// The key that was saved
    pub key: String,
}

impl SaveResponse {
    /// Creates a new SaveResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' saved successfully", key),
            key,
        }
    }
}

/// Response body for the remove operation (DELETE /items/:key)
#[derive(Debug, Clone, Serialize)]
pub struct RemoveResponse {
    /// Success message
    pub message: String,
    /// The key that was removed
    pub key: String,
}

impl RemoveResponse {
    /// Creates a new RemoveResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' removed successfully", key),
            key,
        }
    }
}

/// Response body for the clear operation (POST /clear)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn cleared() -> Self {
        Self {
            message: "Storage cleared successfully".to_string(),
        }
    }
}

/// Response body for the info endpoint (GET /info)
#[derive(Debug, Clone, Serialize)]
pub struct InfoResponse {
    /// Capability set of the configured engine
    pub engine: EngineKind,
    /// Keys held by the engine (or memory cache when memory-only)
    pub keys: Vec<String>,
    /// Fetches currently in flight
    pub in_flight: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
