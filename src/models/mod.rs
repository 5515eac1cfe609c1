//! Request and Response models for the storage API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{ClearRequest, LoadRequest, SaveRequest};
pub use responses::{
    ClearResponse, HealthResponse, InfoResponse, LoadResponse, RemoveResponse, SaveResponse,
};
