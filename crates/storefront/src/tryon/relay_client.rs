//! Client for the try-on relay.

use async_trait::async_trait;
use fitroom_core::{ErrorBody, TryOnRequest, TryOnSuccess};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use super::TryOnRelay;
use crate::config::StorefrontConfig;

/// Message shown when the relay cannot be reached at all.
pub const CONNECT_FAILED: &str = "Failed to connect to server";

/// Errors from a relay call.
#[derive(Debug, Error)]
pub enum RelayClientError {
    /// The request never got an HTTP response.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The relay answered with its error body.
    #[error("relay returned HTTP {status}: {}", body.user_message())]
    Rejected { status: u16, body: ErrorBody },

    /// The relay answered with something that is not one of its bodies.
    #[error("unexpected relay response (HTTP {status}): {body}")]
    Unexpected { status: u16, body: String },

    /// The relay URL could not be joined with the endpoint path.
    #[error("Invalid relay URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl RelayClientError {
    /// Text to show in the flow's `Failed` state.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) | Self::InvalidUrl(_) => CONNECT_FAILED.to_string(),
            Self::Rejected { body, .. } => body.user_message().to_string(),
            Self::Unexpected { status, .. } => format!("Server returned HTTP {status}"),
        }
    }
}

/// HTTP client for `POST /generate-tryon`.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl RelayClient {
    /// Create a client for the relay at `config.relay_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, RelayClientError> {
        Self::with_base(&config.relay_url)
    }

    /// Create a client for the relay at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL cannot be built.
    pub fn with_base(base: &Url) -> Result<Self, RelayClientError> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: base.join("generate-tryon")?,
        })
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TryOnRelay for RelayClient {
    #[instrument(skip(self, request), fields(endpoint = %self.endpoint))]
    async fn generate(&self, request: &TryOnRequest) -> Result<TryOnSuccess, RelayClientError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request.to_body())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        decode_response(status, &body)
    }
}

fn decode_response(status: StatusCode, body: &str) -> Result<TryOnSuccess, RelayClientError> {
    if status.is_success()
        && let Ok(success) = serde_json::from_str::<TryOnSuccess>(body)
    {
        return Ok(success);
    }

    if let Ok(error) = serde_json::from_str::<ErrorBody>(body) {
        tracing::warn!(status = %status, error = %error.error, "Relay rejected try-on");
        return Err(RelayClientError::Rejected {
            status: status.as_u16(),
            body: error,
        });
    }

    tracing::error!(
        status = %status,
        body = %body.chars().take(500).collect::<String>(),
        "Unexpected relay response"
    );
    Err(RelayClientError::Unexpected {
        status: status.as_u16(),
        body: body.chars().take(200).collect(),
    })
}
