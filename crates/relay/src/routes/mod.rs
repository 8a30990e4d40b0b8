//! HTTP route handlers for the relay.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                - Liveness string
//! GET  /health          - Health check
//! POST /generate-tryon  - Compose a person photo with a garment photo
//! OPTIONS *             - 200 for any path (CORS preflight)
//! ```

pub mod tryon;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::RateLimiterLayer;
use crate::state::AppState;

/// Create the try-on routes router, optionally rate limited per client IP.
pub fn tryon_routes(rate_limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    let generate = Router::new().route("/generate-tryon", post(tryon::generate));
    let generate = match rate_limiter {
        Some(layer) => generate.layer(layer),
        None => generate,
    };

    Router::new().route("/", get(tryon::index)).merge(generate)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}
