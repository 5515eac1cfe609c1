//! API Handlers
//!
//! HTTP request handlers for each storage endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{LoadItem, Storage};
use crate::error::{Result, StorageError};
use crate::models::{
    ClearRequest, ClearResponse, HealthResponse, InfoResponse, LoadRequest, LoadResponse,
    RemoveResponse, SaveRequest, SaveResponse,
};
use crate::tasks::SweepReport;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared storage; it synchronizes internally
    pub storage: Arc<Storage>,
}

impl AppState {
    /// Creates a new AppState around the given storage.
    pub fn new(storage: Storage) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }
}

/// Handler for PUT /items
///
/// Saves a value under a key with an optional TTL.
pub async fn save_handler(
    State(state): State<AppState>,
    Json(req): Json<SaveRequest>,
) -> Result<Json<SaveResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(StorageError::InvalidKey(error_msg));
    }

    let key = req.key.clone();
    state.storage.save(req.into_item()).await?;

    Ok(Json(SaveResponse::new(key)))
}

/// Handler for GET /items/:key
///
/// Loads a key with default options.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<LoadResponse>> {
    let data = state.storage.load(LoadItem::new(key.clone())).await?;

    Ok(Json(LoadResponse::new(key, data)))
}

/// Handler for POST /load
///
/// Loads a key with explicit parameters and options.
pub async fn load_handler(
    State(state): State<AppState>,
    Json(req): Json<LoadRequest>,
) -> Result<Json<LoadResponse>> {
    let key = req.key.clone();
    let data = state.storage.load(req.into_item()).await?;

    Ok(Json(LoadResponse::new(key, data)))
}

/// Handler for DELETE /items/:key
pub async fn remove_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RemoveResponse>> {
    state.storage.remove(key.as_str()).await?;

    Ok(Json(RemoveResponse::new(key)))
}

/// Handler for POST /clear
///
/// Clears everything outside the request and configured whitelists.
pub async fn clear_handler(
    State(state): State<AppState>,
    Json(req): Json<ClearRequest>,
) -> Result<Json<ClearResponse>> {
    state.storage.clear(&req.white_list).await?;

    Ok(Json(ClearResponse::cleared()))
}

/// Handler for GET /info
pub async fn info_handler(State(state): State<AppState>) -> Result<Json<InfoResponse>> {
    let info = state.storage.info().await?;

    Ok(Json(InfoResponse {
        engine: state.storage.engine_kind(),
        keys: info.keys,
        in_flight: state.storage.in_flight(),
    }))
}

/// Handler for POST /sweep
///
/// Runs one expiry sweep immediately.
pub async fn sweep_handler(State(state): State<AppState>) -> Json<SweepReport> {
    Json(state.storage.sweep_expired().await)
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
