//! Public object storage for generated images.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{instrument, warn};
use url::Url;

use crate::config::StorageConfig;

/// Errors that can occur when writing to the bucket.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage service refused the write.
    #[error("storage returned HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Object name does not form a valid URL.
    #[error("invalid object url: {0}")]
    InvalidUrl(String),
}

/// Port for a bucket whose objects are publicly readable.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `name`. Existing objects are never overwritten.
    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Public URL at which `name` can be read.
    fn public_url(&self, name: &str) -> Result<Url, StorageError>;
}

/// [`ObjectStore`] over a Supabase-compatible storage REST API.
///
/// Objects are written with `POST storage/v1/object/{bucket}/{name}` and read
/// from `storage/v1/object/public/{bucket}/{name}`.
#[derive(Clone)]
pub struct BucketStore {
    client: reqwest::Client,
    base_url: Url,
    key: SecretString,
    bucket: String,
}

impl BucketStore {
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        let mut base_url = config.url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            client: reqwest::Client::new(),
            base_url,
            key: config.key.clone(),
            bucket: config.bucket.clone(),
        }
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, prefix: &str, name: &str) -> Result<Url, StorageError> {
        let path = format!(
            "{prefix}/{}/{}",
            urlencoding::encode(&self.bucket),
            urlencoding::encode(name)
        );
        self.base_url
            .join(&path)
            .map_err(|e| StorageError::InvalidUrl(format!("{path}: {e}")))
    }
}

#[async_trait]
impl ObjectStore for BucketStore {
    #[instrument(skip(self, bytes), fields(bucket = %self.bucket, size = bytes.len()))]
    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let url = self.object_url("storage/v1/object", name)?;
        let key = self.key.expose_secret();

        let response = self
            .client
            .post(url)
            .bearer_auth(key)
            .header("apikey", key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, message = %message, "Storage write rejected");
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    fn public_url(&self, name: &str) -> Result<Url, StorageError> {
        self.object_url("storage/v1/object/public", name)
    }
}
