//! Client for the hosted try-on model.
//!
//! The model runs as a Gradio Space. One try-on is three HTTP exchanges:
//!
//! 1. `POST gradio_api/upload` with both images as multipart `files`, which
//!    returns the server-side paths of the uploads.
//! 2. `POST gradio_api/call/tryon` with the positional inputs, which returns
//!    an `event_id`.
//! 3. `GET gradio_api/call/tryon/{event_id}`, a server-sent event stream that
//!    ends with either a `complete` event carrying the outputs or an `error`
//!    event.
//!
//! The first output is the composed image; its URL is transient and must be
//! downloaded promptly.

use std::time::Duration;

use async_trait::async_trait;
use fitroom_core::extension_for_mime;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use super::fetch::ImageBlob;
use crate::config::InferenceConfig;

/// Provider messages that mean "try again later" rather than "this input failed".
///
/// Matched case-insensitively against `error` event payloads.
const BUSY_MARKERS: &[&str] = &[
    "exceeded your gpu quota",
    "gpu quota",
    "queue is full",
    "too many requests",
    "no gpu was available",
    "space is sleeping",
    "currently busy",
];

/// Errors that can occur when calling the inference provider.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider is overloaded, out of quota, or rate limiting.
    #[error("inference provider busy: {0}")]
    Busy(String),

    /// Provider ran the call and reported an error.
    #[error("inference failed: {0}")]
    Rejected(String),

    /// Provider answered with something that does not follow the protocol.
    #[error("unexpected inference response: {0}")]
    Protocol(String),

    /// The call did not finish in time.
    #[error("inference timed out after {0:?}")]
    Timeout(Duration),
}

impl InferenceError {
    /// Whether the failure is an overloaded upstream rather than a bad call.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Busy(_) | Self::Timeout(_))
    }
}

/// Port for the image composition model.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Dress the person in the garment and return the transient URL of the result.
    async fn try_on(&self, person: &ImageBlob, garment: &ImageBlob) -> Result<Url, InferenceError>;
}

/// Fixed inputs sent with every try-on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryOnParams {
    /// Garment description; left empty.
    pub prompt: String,
    pub auto_mask: bool,
    pub auto_crop: bool,
    pub denoise_steps: u32,
    pub seed: u64,
}

impl Default for TryOnParams {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            auto_mask: true,
            auto_crop: false,
            denoise_steps: 30,
            seed: 42,
        }
    }
}

/// [`InferenceProvider`] backed by a Gradio Space's REST API.
#[derive(Clone)]
pub struct GradioClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    params: TryOnParams,
    timeout: Duration,
}

/// `POST gradio_api/call/*` response.
#[derive(Debug, Deserialize)]
struct CallResponse {
    event_id: String,
}

/// One server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

impl GradioClient {
    /// Endpoint name of the try-on function in the Space.
    pub const ENDPOINT: &'static str = "tryon";

    /// Create a client for the configured Space.
    #[must_use]
    pub fn new(config: &InferenceConfig, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: with_trailing_slash(config.base_url.clone()),
            token: config.token.clone(),
            params: TryOnParams::default(),
            timeout,
        }
    }

    fn url(&self, path: &str) -> Result<Url, InferenceError> {
        self.base_url
            .join(path)
            .map_err(|e| InferenceError::Protocol(format!("invalid endpoint path {path}: {e}")))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Upload both images, returning their server-side paths in order.
    async fn upload(&self, person: &ImageBlob, garment: &ImageBlob) -> Result<Vec<String>, InferenceError> {
        let form = Form::new()
            .part("files", image_part(person, "person")?)
            .part("files", image_part(garment, "garment")?);

        let response = self
            .authorize(self.client.post(self.url("gradio_api/upload")?))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;

        let paths: Vec<String> = response
            .json()
            .await
            .map_err(|e| InferenceError::Protocol(format!("upload response: {e}")))?;

        if paths.len() != 2 {
            return Err(InferenceError::Protocol(format!(
                "expected 2 uploaded paths, got {}",
                paths.len()
            )));
        }
        Ok(paths)
    }

    /// Start the call and return its event id.
    async fn start_call(&self, person_path: &str, garment_path: &str) -> Result<String, InferenceError> {
        let body = json!({
            "data": [
                {
                    "background": file_data(person_path),
                    "layers": [],
                    "composite": null
                },
                file_data(garment_path),
                self.params.prompt,
                self.params.auto_mask,
                self.params.auto_crop,
                self.params.denoise_steps,
                self.params.seed
            ]
        });

        let path = format!("gradio_api/call/{}", Self::ENDPOINT);
        let response = self
            .authorize(self.client.post(self.url(&path)?))
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let call: CallResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Protocol(format!("call response: {e}")))?;
        Ok(call.event_id)
    }

    /// Wait for the call's terminal event and extract the result URL.
    async fn await_result(&self, event_id: &str) -> Result<Url, InferenceError> {
        let path = format!("gradio_api/call/{}/{event_id}", Self::ENDPOINT);
        let response = self
            .authorize(self.client.get(self.url(&path)?))
            .send()
            .await?;
        let response = check_status(response).await?;

        // The stream closes after the terminal event
        let stream = response.text().await?;
        let outputs = terminal_outputs(&parse_events(&stream))?;
        self.output_url(&outputs)
    }

    /// URL of the first output, resolving server paths against the Space.
    fn output_url(&self, outputs: &[Value]) -> Result<Url, InferenceError> {
        let first = outputs
            .first()
            .ok_or_else(|| InferenceError::Protocol("call completed without outputs".to_string()))?;

        if let Some(url) = first.get("url").and_then(Value::as_str) {
            return Url::parse(url)
                .map_err(|e| InferenceError::Protocol(format!("invalid output url {url}: {e}")));
        }

        if let Some(path) = first.get("path").and_then(Value::as_str) {
            return self.url(&format!("gradio_api/file={path}"));
        }

        Err(InferenceError::Protocol(format!(
            "first output is not a file: {first}"
        )))
    }
}

#[async_trait]
impl InferenceProvider for GradioClient {
    #[instrument(skip_all, fields(endpoint = Self::ENDPOINT))]
    async fn try_on(&self, person: &ImageBlob, garment: &ImageBlob) -> Result<Url, InferenceError> {
        let call = async {
            let paths = self.upload(person, garment).await?;
            let (Some(person_path), Some(garment_path)) = (paths.first(), paths.get(1)) else {
                return Err(InferenceError::Protocol("missing uploaded paths".to_string()));
            };

            let event_id = self.start_call(person_path, garment_path).await?;
            debug!(event_id = %event_id, "Inference call started");

            self.await_result(&event_id).await
        };

        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| InferenceError::Timeout(self.timeout))?
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn image_part(blob: &ImageBlob, name: &str) -> Result<Part, InferenceError> {
    Part::bytes(blob.bytes.clone())
        .file_name(upload_file_name(blob, name))
        .mime_str(blob.mime_type())
        .map_err(|e| InferenceError::Protocol(format!("invalid image type: {e}")))
}

fn upload_file_name(blob: &ImageBlob, name: &str) -> String {
    format!("{name}.{}", extension_for_mime(blob.mime_type()))
}

fn file_data(path: &str) -> Value {
    json!({ "path": path, "meta": { "_type": "gradio.FileData" } })
}

/// Turn throttling statuses into [`InferenceError::Busy`] and other failures
/// into [`InferenceError::Rejected`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, InferenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("HTTP {status}: {}", body.chars().take(200).collect::<String>());
    warn!(status = %status, "Inference provider returned non-success status");

    if matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
    ) || is_busy_message(&body)
    {
        Err(InferenceError::Busy(message))
    } else {
        Err(InferenceError::Rejected(message))
    }
}

fn is_busy_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    BUSY_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Split a server-sent event stream into events.
///
/// Events are separated by blank lines; multiple `data:` lines are joined with
/// newlines. Comment lines and unknown fields are ignored.
#[must_use]
pub fn parse_events(stream: &str) -> Vec<SseEvent> {
    let normalized = stream.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data: Vec<&str> = Vec::new();

            for line in block.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    event = Some(value.trim().to_string());
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push(value.strip_prefix(' ').unwrap_or(value));
                }
            }

            event.map(|event| SseEvent {
                event,
                data: data.join("\n"),
            })
        })
        .collect()
}

/// Extract the outputs from the first terminal event.
///
/// # Errors
///
/// Returns the provider's error (classified as busy or rejected) for an
/// `error` event, and [`InferenceError::Protocol`] if no terminal event
/// arrived or its payload is not an output list.
pub fn terminal_outputs(events: &[SseEvent]) -> Result<Vec<Value>, InferenceError> {
    let terminal = events
        .iter()
        .find(|e| e.event == "complete" || e.event == "error")
        .ok_or_else(|| InferenceError::Protocol("event stream ended without a result".to_string()))?;

    if terminal.event == "error" {
        let message = match serde_json::from_str::<Value>(&terminal.data) {
            Ok(Value::String(message)) => message,
            Ok(Value::Null) | Err(_) if terminal.data.trim().is_empty() || terminal.data.trim() == "null" => {
                "inference provider reported an error".to_string()
            }
            _ => terminal.data.clone(),
        };

        return Err(if is_busy_message(&message) {
            InferenceError::Busy(message)
        } else {
            InferenceError::Rejected(message)
        });
    }

    match serde_json::from_str::<Value>(&terminal.data) {
        Ok(Value::Array(outputs)) => Ok(outputs),
        Ok(other) => Err(InferenceError::Protocol(format!(
            "complete event is not a list: {other}"
        ))),
        Err(e) => Err(InferenceError::Protocol(format!("complete event: {e}"))),
    }
}
