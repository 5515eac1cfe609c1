//! API Routes
//!
//! Configures the Axum router with all storage endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, get_handler, health_handler, info_handler, load_handler, remove_handler,
    save_handler, sweep_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /items` - Save a value
/// - `GET /items/:key` - Load a value with default options
/// - `DELETE /items/:key` - Remove a value
/// - `POST /load` - Load with parameters and options
/// - `POST /clear` - Clear everything outside the whitelist
/// - `GET /info` - List stored keys
/// - `POST /sweep` - Run an expiry sweep now
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/items", put(save_handler))
        .route("/items/:key", get(get_handler).delete(remove_handler))
        .route("/load", post(load_handler))
        .route("/clear", post(clear_handler))
        .route("/info", get(info_handler))
        .route("/sweep", post(sweep_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
