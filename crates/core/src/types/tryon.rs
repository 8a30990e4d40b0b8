//! Wire types for the try-on relay endpoint.
//!
//! `POST /generate-tryon` takes a [`GenerateTryOnBody`] and answers with either
//! a [`TryOnSuccess`] or an [`ErrorBody`]. The body is validated into a
//! [`TryOnRequest`] before any external call is made.

use serde::{Deserialize, Serialize};
use url::Url;

/// Raw request body as sent by clients.
///
/// Both fields are optional at the wire level so that a missing field can be
/// reported with the relay's own error body instead of a deserializer message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTryOnBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garment_url: Option<String>,
}

/// Errors found while validating a [`GenerateTryOnBody`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TryOnRequestError {
    /// One or both image URLs are absent or empty.
    #[error("Missing image URLs")]
    MissingImageUrls,
    /// A field is not an absolute http(s) URL.
    #[error("{field} is not a valid http(s) URL: {reason}")]
    InvalidUrl {
        /// Wire name of the offending field.
        field: &'static str,
        /// Why the value was refused.
        reason: String,
    },
}

/// A validated try-on request: a photo of a person and a photo of a garment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryOnRequest {
    pub person_image: Url,
    pub garment_image: Url,
}

impl TryOnRequest {
    /// Create a request from already parsed URLs.
    #[must_use]
    pub const fn new(person_image: Url, garment_image: Url) -> Self {
        Self {
            person_image,
            garment_image,
        }
    }

    /// Validate a raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`TryOnRequestError::MissingImageUrls`] if either field is
    /// missing or blank, and [`TryOnRequestError::InvalidUrl`] if a field is
    /// not an absolute `http`/`https` URL.
    pub fn from_body(body: &GenerateTryOnBody) -> Result<Self, TryOnRequestError> {
        let person = non_blank(body.person_url.as_deref());
        let garment = non_blank(body.garment_url.as_deref());

        let (Some(person), Some(garment)) = (person, garment) else {
            return Err(TryOnRequestError::MissingImageUrls);
        };

        Ok(Self {
            person_image: parse_http_url("personUrl", person)?,
            garment_image: parse_http_url("garmentUrl", garment)?,
        })
    }

    /// Wire body for this request.
    #[must_use]
    pub fn to_body(&self) -> GenerateTryOnBody {
        GenerateTryOnBody {
            person_url: Some(self.person_image.to_string()),
            garment_url: Some(self.garment_image.to_string()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_http_url(field: &'static str, value: &str) -> Result<Url, TryOnRequestError> {
    let url = Url::parse(value).map_err(|e| TryOnRequestError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        scheme => Err(TryOnRequestError::InvalidUrl {
            field,
            reason: format!("unsupported scheme '{scheme}'"),
        }),
    }
}

/// Successful relay response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TryOnSuccess {
    pub success: bool,
    pub url: Url,
}

impl TryOnSuccess {
    #[must_use]
    pub const fn new(url: Url) -> Self {
        Self { success: true, url }
    }
}

/// Error body returned by the relay for every failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    #[must_use]
    pub fn new(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            error: error.into(),
            details,
        }
    }

    /// Message to show the user: `details` when present, otherwise `error`.
    #[must_use]
    pub fn user_message(&self) -> &str {
        self.details.as_deref().unwrap_or(&self.error)
    }
}

/// Outcome of a try-on as held in client view state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryOnResult {
    pub success: bool,
    pub result_image_ref: Option<Url>,
    pub error_message: Option<String>,
}

impl TryOnResult {
    #[must_use]
    pub const fn succeeded(url: Url) -> Self {
        Self {
            success: true,
            result_image_ref: Some(url),
            error_message: None,
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result_image_ref: None,
            error_message: Some(message.into()),
        }
    }
}

impl From<TryOnSuccess> for TryOnResult {
    fn from(success: TryOnSuccess) -> Self {
        Self::succeeded(success.url)
    }
}

impl From<ErrorBody> for TryOnResult {
    fn from(body: ErrorBody) -> Self {
        Self::failed(body.user_message())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn body(person: Option<&str>, garment: Option<&str>) -> GenerateTryOnBody {
        GenerateTryOnBody {
            person_url: person.map(String::from),
            garment_url: garment.map(String::from),
        }
    }

    #[test]
    fn test_missing_person_url() {
        let result = TryOnRequest::from_body(&body(None, Some("https://x/g.jpg")));
        assert_eq!(result, Err(TryOnRequestError::MissingImageUrls));
    }

    #[test]
    fn test_blank_garment_url_counts_as_missing() {
        let result = TryOnRequest::from_body(&body(Some("https://x/p.jpg"), Some("  ")));
        assert_eq!(result, Err(TryOnRequestError::MissingImageUrls));
    }

    #[test]
    fn test_non_http_scheme_is_invalid() {
        let result = TryOnRequest::from_body(&body(Some("file:///etc/passwd"), Some("https://x/g.jpg")));
        assert!(matches!(
            result,
            Err(TryOnRequestError::InvalidUrl { field: "personUrl", .. })
        ));
    }

    #[test]
    fn test_valid_body() {
        let request =
            TryOnRequest::from_body(&body(Some("https://x/p.jpg"), Some("https://x/g.jpg"))).unwrap();
        assert_eq!(request.person_image.as_str(), "https://x/p.jpg");
        assert_eq!(request.garment_image.as_str(), "https://x/g.jpg");
    }

    #[test]
    fn test_body_uses_camel_case() {
        let json = serde_json::json!({ "personUrl": "https://x/p.jpg" });
        let parsed: GenerateTryOnBody = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.person_url.as_deref(), Some("https://x/p.jpg"));
        assert!(parsed.garment_url.is_none());
    }

    #[test]
    fn test_error_body_prefers_details() {
        let body = ErrorBody::new("Failed", Some("quota exceeded".to_string()));
        assert_eq!(TryOnResult::from(body).error_message.as_deref(), Some("quota exceeded"));

        let body = ErrorBody::new("Missing image URLs", None);
        assert_eq!(body.user_message(), "Missing image URLs");
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "error": "Missing image URLs" })
        );
    }
}
