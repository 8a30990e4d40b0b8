//! Client for the hosted data store's REST API.
//!
//! # Architecture
//!
//! - Tables are read and written through a PostgREST-style API under
//!   `rest/v1/<table>`; filters are query parameters such as `id=eq.<id>`.
//! - The data store is the source of truth. Nothing is persisted locally.
//! - Catalog reads are cached in memory via `moka` (5 minute TTL). Cart,
//!   wishlist, order, review and try-on history calls always go to the network.
//! - Photos for try-on are written to a storage bucket under
//!   `storage/v1/object/<bucket>/<user>/<uuid>.<ext>`.
//!
//! # Example
//!
//! ```rust,ignore
//! use fitroom_storefront::datastore::{DataStoreClient, ProductQuery, UserSession};
//!
//! let client = DataStoreClient::new(&config);
//! let page = client.list_products(&ProductQuery::default()).await?;
//!
//! let session = UserSession::new(user_id, access_token);
//! let line = client.add_to_cart(&session, &page[0].id, Quantity::ONE).await?;
//! ```

mod cache;
mod cart;
mod catalog;
mod history;
mod orders;
mod uploads;

use std::sync::Arc;
use std::time::Duration;

use fitroom_core::UserId;
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::StorefrontConfig;

use cache::{CacheKey, CacheValue};
pub use catalog::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, ProductQuery, TRYON_CATALOG_LIMIT};
pub use uploads::SessionUploads;

/// Errors that can occur when talking to the data store.
#[derive(Debug, Error)]
pub enum DataStoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The data store answered with a non-success status.
    #[error("data store returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The session is missing, expired, or not allowed to do this.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An order was requested for a cart without priced lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// An identifier was empty.
    #[error("Invalid id: {0}")]
    InvalidId(#[from] fitroom_core::IdError),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// An authenticated user as handed to the client by the auth layer.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct UserSession {
    pub user_id: UserId,
    pub access_token: SecretString,
}

impl UserSession {
    #[must_use]
    pub fn new(user_id: UserId, access_token: impl Into<String>) -> Self {
        Self {
            user_id,
            access_token: SecretString::from(access_token.into()),
        }
    }
}

impl std::fmt::Debug for UserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSession")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// DataStoreClient
// =============================================================================

/// Client for the hosted data store.
///
/// Cheaply cloneable; clones share the HTTP connection pool and the catalog cache.
#[derive(Clone)]
pub struct DataStoreClient {
    inner: Arc<DataStoreClientInner>,
}

struct DataStoreClientInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    uploads_bucket: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for DataStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStoreClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("uploads_bucket", &self.inner.uploads_bucket)
            .finish_non_exhaustive()
    }
}

/// `Prefer` header for writes that should echo the written rows.
const RETURN_REPRESENTATION: &str = "return=representation";

impl DataStoreClient {
    /// Create a new data store client.
    #[must_use]
    pub fn new(config: &StorefrontConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let mut base_url = config.data_store_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            inner: Arc::new(DataStoreClientInner {
                client: reqwest::Client::new(),
                base_url,
                anon_key: config.anon_key.clone(),
                uploads_bucket: config.uploads_bucket.clone(),
                cache,
            }),
        }
    }

    /// Drop every cached catalog read.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    /// URL of `rest/v1/<table>` with the given query parameters.
    fn table_url(&self, table: &str, params: &[(&str, String)]) -> Result<Url, DataStoreError> {
        let mut url = self
            .inner
            .base_url
            .join(&format!("rest/v1/{table}"))
            .map_err(|e| DataStoreError::InvalidUrl(format!("{table}: {e}")))?;

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Start a request carrying the API key and the caller's bearer token.
    ///
    /// Anonymous reads authenticate with the API key itself.
    fn request(&self, method: Method, url: Url, session: Option<&UserSession>) -> RequestBuilder {
        let key = self.inner.anon_key.expose_secret();
        let bearer = session.map_or(key, |s| s.access_token.expose_secret());

        self.inner
            .client
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(bearer)
    }

    /// Send a request and decode the JSON body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DataStoreError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        check_status(status, &body)?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse data store response"
            );
            DataStoreError::Parse(e)
        })
    }

    /// Send a request whose response body is irrelevant.
    async fn execute_empty(&self, request: RequestBuilder) -> Result<(), DataStoreError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        check_status(status, &body)
    }

    /// Run a read and return its single row, or `NotFound`.
    async fn fetch_one<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: impl FnOnce() -> String,
    ) -> Result<T, DataStoreError> {
        let rows: Vec<T> = self.execute(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DataStoreError::NotFound(what()))
    }
}

fn check_status(status: StatusCode, body: &str) -> Result<(), DataStoreError> {
    if status.is_success() {
        return Ok(());
    }

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        tracing::warn!(status = %status, "Data store rejected credentials");
        return Err(DataStoreError::Unauthorized);
    }

    tracing::error!(
        status = %status,
        body = %body.chars().take(500).collect::<String>(),
        "Data store returned non-success status"
    );
    Err(DataStoreError::Api {
        status: status.as_u16(),
        message: api_message(body),
    })
}

/// Pull `message` out of a PostgREST error body, falling back to the raw text.
fn api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

/// `eq.<value>` filter.
fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub fn client(base: &str) -> DataStoreClient {
        DataStoreClient::new(&StorefrontConfig {
            data_store_url: Url::parse(base).unwrap(),
            anon_key: SecretString::from("anon_3xY9mK2nL5pQ7rT0uW4zC6"),
            relay_url: Url::parse("http://localhost:3000").unwrap(),
            uploads_bucket: "user-uploads".to_string(),
        })
    }

    #[test]
    fn test_table_url_with_filters() {
        let url = client("https://db.example")
            .table_url(
                "cart_items",
                &[("select", "*,products(*)".to_string()), ("user_id", eq("u-1"))],
            )
            .unwrap();

        assert_eq!(url.path(), "/rest/v1/cart_items");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "*,products(*)".to_string()),
                ("user_id".to_string(), "eq.u-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_api_message_prefers_json_message() {
        assert_eq!(
            api_message(r#"{"code":"23503","message":"violates foreign key"}"#),
            "violates foreign key"
        );
        assert_eq!(api_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn test_check_status_maps_auth_failures() {
        assert!(matches!(
            check_status(StatusCode::UNAUTHORIZED, ""),
            Err(DataStoreError::Unauthorized)
        ));
        assert!(matches!(
            check_status(StatusCode::CONFLICT, "{}"),
            Err(DataStoreError::Api { status: 409, .. })
        ));
        assert!(check_status(StatusCode::CREATED, "").is_ok());
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let session = UserSession::new(UserId::parse("u-1").unwrap(), "jwt-secret-token");
        let debug = format!("{session:?}");
        assert!(debug.contains("u-1"));
        assert!(!debug.contains("jwt-secret-token"));
    }
}
