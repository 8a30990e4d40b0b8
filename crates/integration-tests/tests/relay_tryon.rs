//! End-to-end tests of `POST /generate-tryon` against fake upstream services.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::Ordering;

use fitroom_integration_tests::{RESULTS_BUCKET, Upstream, spawn_relay};
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn generate(relay: &url::Url, body: &Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(relay.join("generate-tryon").unwrap())
        .json(body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

fn tryon_body(upstream: &Upstream) -> Value {
    json!({
        "personUrl": upstream.image_url("person.png"),
        "garmentUrl": upstream.image_url("garment.png"),
    })
}

/// Millisecond timestamp out of `.../tryon_<ms>.png`.
fn timestamp(url: &str) -> i64 {
    let name = url.rsplit('/').next().unwrap();
    name.strip_prefix("tryon_")
        .and_then(|rest| rest.strip_suffix(".png"))
        .unwrap()
        .parse()
        .unwrap()
}

#[tokio::test]
async fn test_healthy_upstream_returns_public_url() {
    let upstream = Upstream::start().await;
    let relay = spawn_relay(&upstream).await;

    let (status, body) = generate(&relay, &tryon_body(&upstream)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let url = body["url"].as_str().unwrap();
    assert!(url.contains(&format!("/storage/v1/object/public/{RESULTS_BUCKET}/tryon_")));
    assert!(timestamp(url) > 0);

    // Two sources plus the generated image
    assert_eq!(upstream.image_fetches.load(Ordering::SeqCst), 3);
    assert_eq!(upstream.inference_calls.load(Ordering::SeqCst), 1);
    assert_eq!(upstream.object_names(RESULTS_BUCKET).len(), 1);
}

#[tokio::test]
async fn test_identical_requests_store_distinct_objects() {
    let upstream = Upstream::start().await;
    let relay = spawn_relay(&upstream).await;
    let body = tryon_body(&upstream);

    let (_, first) = generate(&relay, &body).await;
    let (_, second) = generate(&relay, &body).await;

    let first = first["url"].as_str().unwrap().to_string();
    let second = second["url"].as_str().unwrap().to_string();
    assert_ne!(first, second);
    assert!(timestamp(&second) > timestamp(&first));
    assert_eq!(upstream.object_names(RESULTS_BUCKET).len(), 2);
}

#[tokio::test]
async fn test_missing_person_url_is_rejected_without_calls() {
    let upstream = Upstream::start().await;
    let relay = spawn_relay(&upstream).await;

    let body = json!({ "garmentUrl": upstream.image_url("garment.png") });
    let (status, body) = generate(&relay, &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing image URLs" }));
    assert_eq!(upstream.image_fetches.load(Ordering::SeqCst), 0);
    assert_eq!(upstream.inference_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_busy_provider_returns_503() {
    let upstream = Upstream::start().await;
    upstream.set_busy(true);
    let relay = spawn_relay(&upstream).await;

    let (status, body) = generate(&relay, &tryon_body(&upstream)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Try-on service busy");
    assert!(upstream.object_names(RESULTS_BUCKET).is_empty());
}

#[tokio::test]
async fn test_storage_failure_returns_500_with_details() {
    let upstream = Upstream::start().await;
    upstream.set_storage_down(true);
    let relay = spawn_relay(&upstream).await;

    let (status, body) = generate(&relay, &tryon_body(&upstream)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to store result");
    assert!(body["details"].as_str().unwrap().contains("bucket unavailable"));
}

#[tokio::test]
async fn test_options_on_any_path() {
    let upstream = Upstream::start().await;
    let relay = spawn_relay(&upstream).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, relay.join("anything/at/all").unwrap())
        .header("origin", "https://shop.example")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
