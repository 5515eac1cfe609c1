//! API Module
//!
//! HTTP handlers and routing for the storage REST API.
//!
//! # Endpoints
//! - `PUT /items` - Save a value
//! - `GET /items/:key` - Load a value
//! - `DELETE /items/:key` - Remove a value
//! - `POST /load` - Load with parameters and options
//! - `POST /clear` - Clear outside the whitelist
//! - `GET /info` - List stored keys
//! - `POST /sweep` - Run an expiry sweep
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
