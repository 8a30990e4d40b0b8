//! Fitroom try-on relay library.
//!
//! The relay accepts two public image URLs, runs them through a hosted
//! try-on model, stores the result in a public bucket, and returns its URL.
//! The router is exposed here so it can be tested without a socket.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod tryon;

use axum::{Router, middleware::from_fn, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::RateLimiterLayer;
use crate::state::AppState;

/// Build the relay router with its middleware stack.
///
/// Sentry layers are added by the binary so tests run without a client.
pub fn app(state: AppState, rate_limiter: Option<RateLimiterLayer>) -> Router {
    let cors = middleware::cors_layer(&state.config().cors);

    Router::new()
        .route("/health", get(routes::health))
        .merge(routes::tryon_routes(rate_limiter))
        .with_state(state)
        .layer(from_fn(middleware::options_middleware))
        .layer(cors)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode};
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::config::{CorsOrigins, FetchLimits, InferenceConfig, RelayConfig, StorageConfig};
    use crate::tryon::testing::*;
    use crate::tryon::{InferenceError, TryOnPipeline};

    fn config() -> RelayConfig {
        RelayConfig {
            host: [127, 0, 0, 1].into(),
            port: 3000,
            storage: StorageConfig {
                url: Url::parse("https://store.test").unwrap(),
                key: SecretString::from("service_key_3xY9mK2nL5pQ7rT0"),
                bucket: "try-on-results".to_string(),
            },
            inference: InferenceConfig {
                space: "yisol/IDM-VTON".to_string(),
                base_url: Url::parse("https://space.test").unwrap(),
                token: None,
            },
            limits: FetchLimits::default(),
            cors: CorsOrigins::Any,
            rate_limit_burst: 0,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    struct Harness {
        router: Router,
        source: Arc<FakeSource>,
        inference: Arc<FakeInference>,
        store: Arc<MemoryStore>,
    }

    fn harness(inference: FakeInference, store: MemoryStore) -> Harness {
        let source = Arc::new(healthy_source());
        let inference = Arc::new(inference);
        let store = Arc::new(store);
        let pipeline = TryOnPipeline::new(source.clone(), inference.clone(), store.clone());
        let router = app(AppState::with_pipeline(config(), pipeline), None);

        Harness {
            router,
            source,
            inference,
            store,
        }
    }

    fn healthy() -> Harness {
        harness(FakeInference::returning(result_url), MemoryStore::default())
    }

    async fn post_json(router: Router, body: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/generate-tryon")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_generate_success() {
        let h = healthy();
        let body = json!({ "personUrl": PERSON, "garmentUrl": GARMENT }).to_string();

        let (status, json) = post_json(h.router, &body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        let url = json["url"].as_str().unwrap();
        assert!(url.starts_with("https://store.test/public/tryon_"));
        assert!(url.ends_with(".png"));
        assert_eq!(h.store.objects.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_person_url_makes_no_calls() {
        let h = healthy();
        let body = json!({ "garmentUrl": GARMENT }).to_string();

        let (status, json) = post_json(h.router, &body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({ "error": "Missing image URLs" }));
        assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.inference.calls.load(Ordering::SeqCst), 0);
        assert!(h.store.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_garment_url_is_missing() {
        let h = healthy();
        let body = json!({ "personUrl": PERSON, "garmentUrl": "" }).to_string();

        let (status, json) = post_json(h.router, &body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing image URLs");
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let h = healthy();
        let (status, json) = post_json(h.router, "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid JSON body");
        assert!(json["details"].is_string());
        assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_busy_provider_returns_503() {
        let h = harness(
            FakeInference::returning(|| Err(InferenceError::Timeout(Duration::from_secs(300)))),
            MemoryStore::default(),
        );
        let body = json!({ "personUrl": PERSON, "garmentUrl": GARMENT }).to_string();

        let (status, json) = post_json(h.router, &body).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"], "Try-on service busy");
    }

    #[tokio::test]
    async fn test_storage_failure_returns_500_with_details() {
        let h = harness(
            FakeInference::returning(result_url),
            MemoryStore {
                reject: true,
                ..MemoryStore::default()
            },
        );
        let body = json!({ "personUrl": PERSON, "garmentUrl": GARMENT }).to_string();

        let (status, json) = post_json(h.router, &body).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Failed to store result");
        assert!(json["details"].as_str().unwrap().contains("read-only"));
    }

    #[tokio::test]
    async fn test_options_on_any_path() {
        let h = healthy();
        let response = h
            .router
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/anything/at/all")
                    .header("origin", "https://shop.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_preflight_allows_post() {
        let h = healthy();
        let response = h
            .router
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/generate-tryon")
                    .header("origin", "https://shop.example")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let methods = response.headers()["access-control-allow-methods"]
            .to_str()
            .unwrap();
        assert!(methods.contains("POST"));
    }

    #[tokio::test]
    async fn test_liveness_and_health() {
        let h = healthy();
        let response = h
            .router
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], routes::tryon::LIVENESS.as_bytes());

        let response = h
            .router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let h = healthy();
        let response = h
            .router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "req-123");
    }
}
