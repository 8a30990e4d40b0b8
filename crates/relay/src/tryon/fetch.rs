//! Bounded image downloads.
//!
//! Every URL the relay reads from (the two inputs and the generated result) is
//! fetched through an [`ImageSource`]. The HTTP implementation enforces a
//! timeout and a maximum body size.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::FetchLimits;

/// Errors that can occur while downloading an image.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: Url, status: u16 },

    /// The body exceeds the configured limit.
    #[error("{url} is larger than {limit} bytes")]
    TooLarge { url: Url, limit: usize },
}

/// Downloaded image bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub bytes: Vec<u8>,
    /// `Content-Type` reported by the origin, if any.
    pub content_type: Option<String>,
}

impl ImageBlob {
    #[must_use]
    pub const fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            bytes,
            content_type,
        }
    }

    /// Content type to forward, defaulting to PNG.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|ct| ct.starts_with("image/"))
            .unwrap_or("image/png")
    }
}

impl std::fmt::Debug for ImageBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBlob")
            .field("size", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Port for reading images by URL.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Download the image at `url`.
    async fn fetch(&self, url: &Url) -> Result<ImageBlob, FetchError>;
}

/// [`ImageSource`] over HTTP with a timeout and size cap.
#[derive(Clone)]
pub struct HttpImageSource {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpImageSource {
    /// Create an image source honoring `limits`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(limits: &FetchLimits) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(limits.fetch_timeout)
            .build()?;

        Ok(Self {
            client,
            max_bytes: limits.max_image_bytes,
        })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<ImageBlob, FetchError> {
        let mut response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let too_large = || FetchError::TooLarge {
            url: url.clone(),
            limit: self.max_bytes,
        };

        // Reject early when the origin declares an oversized body
        if let Some(length) = response.content_length()
            && usize::try_from(length).map_or(true, |length| length > self.max_bytes)
        {
            return Err(too_large());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(size = bytes.len(), "Fetched image");
        Ok(ImageBlob::new(bytes, content_type))
    }
}
