//! Error types for the storage cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Storage Error Enum ==
/// Unified error type for the storage cache.
///
/// The type is `Clone` because a single fetch outcome is shared by every
/// caller that joined the same in-flight task.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Missing or empty key/prefix
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Cache miss or expiry with no fetcher registered for the key
    #[error("No sync method for key '{key}' (syncFn: {fetcher})")]
    NoFetcher { key: String, fetcher: String },

    /// Fetcher did not settle into a usable result
    #[error("Fetch protocol error: {0}")]
    FetchProtocol(String),

    /// Fetcher rejected
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Storage engine call failed
    #[error("Backend error: {0}")]
    Backend(String),

    /// Operation not available for the configured engine kind
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Envelope could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Builds a `NoFetcher` error for a key with no registered fetcher.
    pub fn no_fetcher(key: impl Into<String>) -> Self {
        StorageError::NoFetcher {
            key: key.into(),
            fetcher: "none".to_string(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for StorageError {
    fn into_response(self) -> Response {
        let status = match &self {
            StorageError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            StorageError::NoFetcher { .. } => StatusCode::NOT_FOUND,
            StorageError::FetchProtocol(_) | StorageError::Fetch(_) => StatusCode::BAD_GATEWAY,
            StorageError::Backend(_) => StatusCode::SERVICE_UNAVAILABLE,
            StorageError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            StorageError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the storage cache.
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_fetcher_names_key() {
        let err = StorageError::no_fetcher("foo");
        let msg = err.to_string();
        assert!(msg.contains("'foo'"));
        assert!(msg.contains("syncFn: none"));
    }

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (StorageError::InvalidKey("".into()), StatusCode::BAD_REQUEST),
            (StorageError::no_fetcher("k"), StatusCode::NOT_FOUND),
            (StorageError::Fetch("boom".into()), StatusCode::BAD_GATEWAY),
            (StorageError::Backend("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (StorageError::Unsupported("sync".into()), StatusCode::NOT_IMPLEMENTED),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
