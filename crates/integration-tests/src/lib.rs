//! Integration tests for Fitroom.
//!
//! Everything runs in-process on `127.0.0.1:0`:
//!
//! - [`Upstream`] fakes the third parties: image hosting, the Gradio Space,
//!   the storage bucket and the data store's REST tables. The tables
//!   understand the subset of PostgREST the clients use: `eq.` and `ilike.`
//!   filters, `limit`/`offset`, embedding `products(*)`, upserts with
//!   `on_conflict` and `return=representation`.
//! - [`spawn_relay`] serves the real relay router wired to its real HTTP
//!   adapters, all pointed at one [`Upstream`].
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p fitroom-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use fitroom_relay::config::{CorsOrigins, FetchLimits, InferenceConfig, RelayConfig, StorageConfig};
use fitroom_relay::state::AppState;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

/// Bucket the relay writes results to.
pub const RESULTS_BUCKET: &str = "tryon-results";

/// Minimal PNG signature plus padding; the fakes never decode images.
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n-fitroom-test-image";

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

/// Shared state of the fake third parties.
#[derive(Default)]
pub struct Upstream {
    base: OnceLock<Url>,
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
    tables: Mutex<HashMap<String, Vec<Value>>>,
    next_row: AtomicUsize,
    busy: AtomicBool,
    storage_down: AtomicBool,
    pub image_fetches: AtomicUsize,
    pub inference_calls: AtomicUsize,
    /// Reads of the `products` table.
    pub product_reads: AtomicUsize,
    /// Deletes of a whole cart (no `id` filter).
    pub cart_clears: AtomicUsize,
}

impl Upstream {
    /// Start the fake servers.
    pub async fn start() -> Arc<Self> {
        let upstream = Arc::new(Self::default());
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        upstream
            .base
            .set(Url::parse(&format!("http://{addr}/")).unwrap())
            .unwrap();

        let router = Self::router(Arc::clone(&upstream));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        upstream
    }

    fn router(state: Arc<Self>) -> Router {
        Router::new()
            .route("/images/{name}", get(image))
            .route("/outputs/{name}", get(image))
            .route("/gradio_api/upload", post(gradio_upload))
            .route("/gradio_api/call/tryon", post(gradio_call))
            .route("/gradio_api/call/tryon/{event_id}", get(gradio_events))
            .route("/storage/v1/object/public/{bucket}/{*name}", get(public_object))
            .route("/storage/v1/object/{bucket}/{*name}", post(put_object))
            .route(
                "/rest/v1/{table}",
                get(select_rows)
                    .post(insert_rows)
                    .patch(update_rows)
                    .delete(delete_rows),
            )
            .with_state(state)
    }

    /// Base URL of the fake servers.
    pub fn base(&self) -> &Url {
        self.base.get().unwrap()
    }

    /// URL of a hosted test image.
    pub fn image_url(&self, name: &str) -> String {
        self.base().join(&format!("images/{name}")).unwrap().to_string()
    }

    /// Make the Space answer every upload with 503.
    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }

    /// Make the bucket refuse every write.
    pub fn set_storage_down(&self, down: bool) {
        self.storage_down.store(down, Ordering::SeqCst);
    }

    /// Names of stored objects in `bucket`, sorted.
    pub fn object_names(&self, bucket: &str) -> Vec<String> {
        let prefix = format!("{bucket}/");
        let mut names: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix).map(String::from))
            .collect();
        names.sort();
        names
    }

    /// Replace the catalog.
    pub fn set_products(&self, rows: Vec<Value>) {
        self.tables
            .lock()
            .unwrap()
            .insert("products".to_string(), rows);
    }

    /// Replace the cart lines of `user_id`.
    pub fn set_cart(&self, user_id: &str, rows: Vec<Value>) {
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row["user_id"] = json!(user_id);
                row
            })
            .collect();
        self.tables
            .lock()
            .unwrap()
            .insert("cart_items".to_string(), rows);
    }

    /// Current rows of `table`, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Relay configuration pointing every adapter at this upstream.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            storage: StorageConfig {
                url: self.base().clone(),
                key: SecretString::from("svc_Q8m2ZkT4xR7pW1nL5vC9bJ3h"),
                bucket: RESULTS_BUCKET.to_string(),
            },
            inference: InferenceConfig {
                space: "test/virtual-try-on".to_string(),
                base_url: self.base().clone(),
                token: None,
            },
            limits: FetchLimits::default(),
            cors: CorsOrigins::Any,
            rate_limit_burst: 0,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

/// Serve the relay against `upstream` and return its base URL.
pub async fn spawn_relay(upstream: &Upstream) -> Url {
    let state = AppState::new(upstream.relay_config()).unwrap();
    let addr = serve(fitroom_relay::app(state, None)).await;
    Url::parse(&format!("http://{addr}/")).unwrap()
}

// =============================================================================
// Fake handlers
// =============================================================================

async fn image(State(state): State<Arc<Upstream>>) -> Response {
    state.image_fetches.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "image/png")], PNG).into_response()
}

async fn gradio_upload(State(state): State<Arc<Upstream>>, headers: HeaderMap, _body: Bytes) -> Response {
    if state.busy.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "Queue is full").into_response();
    }

    let multipart = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));
    if !multipart {
        return (StatusCode::UNSUPPORTED_MEDIA_TYPE, "expected multipart").into_response();
    }

    axum::Json(json!(["/tmp/gradio/person.png", "/tmp/gradio/garment.png"])).into_response()
}

async fn gradio_call(State(state): State<Arc<Upstream>>, axum::Json(body): axum::Json<Value>) -> Response {
    let inputs = body["data"].as_array().map_or(0, Vec::len);
    if inputs != 7 {
        return (StatusCode::UNPROCESSABLE_ENTITY, "expected 7 inputs").into_response();
    }

    let n = state.inference_calls.fetch_add(1, Ordering::SeqCst);
    axum::Json(json!({ "event_id": format!("evt-{n}") })).into_response()
}

async fn gradio_events(State(state): State<Arc<Upstream>>, Path(event_id): Path<String>) -> String {
    let output = state.base().join(&format!("outputs/{event_id}.png")).unwrap();
    let data = json!([{ "path": format!("/tmp/gradio/{event_id}.png"), "url": output }]);
    format!("event: generating\ndata: null\n\nevent: complete\ndata: {data}\n\n")
}

async fn put_object(
    State(state): State<Arc<Upstream>>,
    Path((bucket, name)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if state.storage_down.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({ "message": "bucket unavailable" })),
        )
            .into_response();
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let key = format!("{bucket}/{name}");

    let mut objects = state.objects.lock().unwrap();
    if objects.contains_key(&key) {
        return (StatusCode::CONFLICT, axum::Json(json!({ "message": "Duplicate" }))).into_response();
    }
    objects.insert(key.clone(), (content_type, body.to_vec()));
    axum::Json(json!({ "Key": key })).into_response()
}

async fn public_object(
    State(state): State<Arc<Upstream>>,
    Path((bucket, name)): Path<(String, String)>,
) -> Response {
    let objects = state.objects.lock().unwrap();
    match objects.get(&format!("{bucket}/{name}")) {
        Some((content_type, bytes)) => {
            ([(header::CONTENT_TYPE, content_type.clone())], bytes.clone()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// =============================================================================
// Fake REST tables
// =============================================================================

type Params = Query<Vec<(String, String)>>;

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Column filters: every parameter that is not a PostgREST keyword.
fn filters(params: &[(String, String)]) -> Vec<(&str, &str)> {
    params
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "select" | "order" | "limit" | "offset" | "on_conflict"))
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

fn column(row: &Value, name: &str) -> Option<String> {
    match row.get(name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn matches_filter(row: &Value, name: &str, filter: &str) -> bool {
    let Some(value) = column(row, name) else {
        return false;
    };
    if let Some(expected) = filter.strip_prefix("eq.") {
        return value == expected;
    }
    if let Some(pattern) = filter.strip_prefix("ilike.") {
        let mut needle = String::new();
        let mut escaped = false;
        for c in pattern.trim_matches('*').chars() {
            if c == '\\' && !escaped {
                escaped = true;
                continue;
            }
            escaped = false;
            needle.push(c);
        }
        return value.to_lowercase().contains(&needle.to_lowercase());
    }
    false
}

fn matches_all(row: &Value, filters: &[(&str, &str)]) -> bool {
    filters
        .iter()
        .all(|(name, filter)| matches_filter(row, name, filter))
}

fn returns_rows(headers: &HeaderMap) -> bool {
    headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("return=representation"))
}

fn merges_duplicates(headers: &HeaderMap) -> bool {
    headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("resolution=merge-duplicates"))
}

fn rows_response(status: StatusCode, rows: Vec<Value>) -> Response {
    (status, axum::Json(Value::Array(rows))).into_response()
}

impl Upstream {
    /// Embed the referenced product for `select=...products(*)`.
    fn embed(&self, tables: &HashMap<String, Vec<Value>>, mut rows: Vec<Value>, select: Option<&str>) -> Vec<Value> {
        if !select.is_some_and(|s| s.contains("products(*)")) {
            return rows;
        }
        let products = tables.get("products").map(Vec::as_slice).unwrap_or_default();
        for row in &mut rows {
            if row.get("products").is_some() {
                continue;
            }
            let product = column(row, "product_id")
                .and_then(|id| products.iter().find(|p| column(p, "id").as_deref() == Some(id.as_str())))
                .cloned()
                .unwrap_or(Value::Null);
            row["products"] = product;
        }
        rows
    }

    fn next_id(&self, table: &str) -> String {
        let n = self.next_row.fetch_add(1, Ordering::SeqCst);
        format!("{table}-{n}")
    }
}

async fn select_rows(State(state): State<Arc<Upstream>>, Path(table): Path<String>, Query(params): Params) -> Response {
    if table == "products" {
        state.product_reads.fetch_add(1, Ordering::SeqCst);
    }

    let tables = state.tables.lock().unwrap();
    let filters = filters(&params);
    let mut rows: Vec<Value> = tables
        .get(&table)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter(|row| matches_all(row, &filters))
        .cloned()
        .collect();

    // Rows are appended as they are created, so `desc` is reverse insertion order
    if param(&params, "order").is_some_and(|o| o.ends_with(".desc")) {
        rows.reverse();
    }
    let offset = param(&params, "offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit = param(&params, "limit").and_then(|v| v.parse().ok()).unwrap_or(usize::MAX);
    let rows = rows.into_iter().skip(offset).take(limit).collect();

    let rows = state.embed(&tables, rows, param(&params, "select"));
    rows_response(StatusCode::OK, rows)
}

async fn insert_rows(
    State(state): State<Arc<Upstream>>,
    Path(table): Path<String>,
    Query(params): Params,
    headers: HeaderMap,
    axum::Json(body): axum::Json<Value>,
) -> Response {
    let new_rows = match body {
        Value::Array(rows) => rows,
        row => vec![row],
    };
    let conflict: Vec<&str> = param(&params, "on_conflict")
        .map(|cols| cols.split(',').collect())
        .unwrap_or_default();

    let mut tables = state.tables.lock().unwrap();
    let mut written = Vec::new();
    for mut row in new_rows {
        let existing = tables.entry(table.clone()).or_default().iter_mut().find(|old| {
            !conflict.is_empty() && conflict.iter().all(|c| column(old, c) == column(&row, c))
        });

        match existing {
            Some(_) if !merges_duplicates(&headers) => {
                return (
                    StatusCode::CONFLICT,
                    axum::Json(json!({ "code": "23505", "message": "duplicate key value" })),
                )
                    .into_response();
            }
            Some(old) => {
                if let (Some(old_fields), Value::Object(new_fields)) = (old.as_object_mut(), row) {
                    old_fields.extend(new_fields);
                }
                written.push(old.clone());
            }
            None => {
                if row.get("id").is_none() {
                    row["id"] = json!(state.next_id(&table));
                }
                tables.entry(table.clone()).or_default().push(row.clone());
                written.push(row);
            }
        }
    }

    if table == "reviews" {
        bump_review_counts(&mut tables, &written);
    }

    if !returns_rows(&headers) {
        return StatusCode::CREATED.into_response();
    }
    let written = state.embed(&tables, written, param(&params, "select"));
    rows_response(StatusCode::CREATED, written)
}

/// Products carry their review count, as the real schema's trigger keeps it.
fn bump_review_counts(tables: &mut HashMap<String, Vec<Value>>, reviews: &[Value]) {
    let Some(products) = tables.get_mut("products") else {
        return;
    };
    for review in reviews {
        let product_id = column(review, "product_id");
        if let Some(product) = products.iter_mut().find(|p| column(p, "id") == product_id) {
            let count = product["reviews_count"].as_i64().unwrap_or(0);
            product["reviews_count"] = json!(count + 1);
        }
    }
}

async fn update_rows(
    State(state): State<Arc<Upstream>>,
    Path(table): Path<String>,
    Query(params): Params,
    headers: HeaderMap,
    axum::Json(patch): axum::Json<Value>,
) -> Response {
    let filters = filters(&params);
    let mut tables = state.tables.lock().unwrap();

    let mut updated = Vec::new();
    for row in tables.entry(table).or_default().iter_mut() {
        if !matches_all(row, &filters) {
            continue;
        }
        if let (Some(fields), Some(changes)) = (row.as_object_mut(), patch.as_object()) {
            fields.extend(changes.clone());
        }
        updated.push(row.clone());
    }

    if !returns_rows(&headers) {
        return StatusCode::NO_CONTENT.into_response();
    }
    let updated = state.embed(&tables, updated, param(&params, "select"));
    rows_response(StatusCode::OK, updated)
}

async fn delete_rows(
    State(state): State<Arc<Upstream>>,
    Path(table): Path<String>,
    Query(params): Params,
    headers: HeaderMap,
) -> Response {
    let filters = filters(&params);
    if table == "cart_items" && !filters.iter().any(|(name, _)| *name == "id") {
        state.cart_clears.fetch_add(1, Ordering::SeqCst);
    }

    let mut tables = state.tables.lock().unwrap();
    let rows = tables.entry(table).or_default();
    let (removed, kept): (Vec<Value>, Vec<Value>) = rows.drain(..).partition(|row| matches_all(row, &filters));
    *rows = kept;

    if returns_rows(&headers) {
        rows_response(StatusCode::OK, removed)
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}
