//! Relay error type with Sentry integration.
//!
//! Every failure of `POST /generate-tryon` is a [`RelayError`]. One table maps
//! each variant to an HTTP status and the stable `error` string clients see;
//! `details` carries the display text of the underlying cause.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fitroom_core::{ErrorBody, TryOnRequestError};
use thiserror::Error;

use crate::tryon::{FetchError, InferenceError, StorageError};

/// Application-level error type for the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The request body is unusable. No external call was made.
    #[error("{error}")]
    InvalidRequest {
        error: &'static str,
        details: Option<String>,
    },

    /// A source image is larger than the configured limit.
    #[error("source image exceeds {limit} bytes")]
    ImageTooLarge { limit: usize },

    /// A source image could not be downloaded.
    #[error("failed to fetch source image: {0}")]
    SourceImage(#[source] FetchError),

    /// The inference provider is busy, out of quota, or timed out.
    #[error("{0}")]
    UpstreamUnavailable(#[source] InferenceError),

    /// The inference provider failed or answered with unusable output.
    #[error("{0}")]
    Inference(#[source] InferenceError),

    /// The generated image could not be downloaded from the provider.
    #[error("failed to fetch generated image: {0}")]
    ResultImage(#[source] FetchError),

    /// The generated image could not be written to the bucket.
    #[error("{0}")]
    StorageWriteFailure(#[source] StorageError),

    /// Anything else.
    #[error("{0}")]
    Unknown(String),
}

impl RelayError {
    /// Invalid JSON body.
    #[must_use]
    pub fn invalid_json(rejection: &JsonRejection) -> Self {
        Self::InvalidRequest {
            error: "Invalid JSON body",
            details: Some(rejection.body_text()),
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::SourceImage(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Inference(_)
            | Self::ResultImage(_)
            | Self::StorageWriteFailure(_)
            | Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable `error` string for the response body.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InvalidRequest { error, .. } => *error,
            Self::ImageTooLarge { .. } => "Image too large",
            Self::SourceImage(_) => "Failed to fetch source image",
            Self::UpstreamUnavailable(_) => "Try-on service busy",
            Self::StorageWriteFailure(_) => "Failed to store result",
            Self::Inference(_) | Self::ResultImage(_) | Self::Unknown(_) => "Failed",
        }
    }

    /// `details` for the response body.
    #[must_use]
    pub fn details(&self) -> Option<String> {
        match self {
            Self::InvalidRequest { details, .. } => details.clone(),
            other => Some(other.to_string()),
        }
    }

    fn body(&self) -> ErrorBody {
        ErrorBody::new(self.label(), self.details())
    }
}

impl From<TryOnRequestError> for RelayError {
    fn from(err: TryOnRequestError) -> Self {
        match err {
            TryOnRequestError::MissingImageUrls => Self::InvalidRequest {
                error: "Missing image URLs",
                details: None,
            },
            TryOnRequestError::InvalidUrl { .. } => Self::InvalidRequest {
                error: "Invalid image URL",
                details: Some(err.to_string()),
            },
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                status = status.as_u16(),
                sentry_event_id = %event_id,
                "Try-on failed"
            );
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Try-on rejected");
        }

        (status, Json(self.body())).into_response()
    }
}

/// Result type alias for `RelayError`.
pub type Result<T> = std::result::Result<T, RelayError>;
