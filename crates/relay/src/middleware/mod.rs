//! HTTP middleware stack for the relay.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with method, uri, status, latency)
//! 3. Request ID (add unique ID to each request and response)
//! 4. CORS (configured origins, preflight handling)
//! 5. OPTIONS short-circuit (200 for any path)
//! 6. Rate limiting on `/generate-tryon` (governor)

pub mod cors;
pub mod rate_limit;
pub mod request_id;

pub use cors::{cors_layer, options_middleware};
pub use rate_limit::{ClientIpKeyExtractor, RateLimiterLayer, tryon_rate_limiter};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
