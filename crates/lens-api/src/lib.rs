//! Axum signaling server.
//!
//! This crate provides:
//! - The `/offer` signaling endpoint backed by the session manager
//! - Health and Prometheus metrics endpoints
//! - CORS and body-limit layers, env-driven configuration

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
