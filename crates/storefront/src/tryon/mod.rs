//! Virtual try-on flow.
//!
//! - [`TryOnFlow`]: pure state machine for one try-on page.
//! - [`ProgressMeter`]: simulated progress while a submission runs.
//! - [`RelayClient`]: HTTP client for the relay's `POST /generate-tryon`.
//! - [`TryOnController`]: drives the flow through the photo upload and the
//!   relay call, allowing one submission at a time.
//!
//! The uploader, the relay and the history recorder are traits so the
//! controller can be exercised without a network.

mod controller;
mod flow;
mod progress;
mod relay_client;

use async_trait::async_trait;
use fitroom_core::{LocalImage, ProductId, TryOnRequest, TryOnSuccess};
use url::Url;

use crate::datastore::DataStoreError;

pub use controller::{DEFAULT_TICK_INTERVAL, TryOnController, UPLOAD_FAILED};
pub use flow::{FlowError, GENERIC_FAILURE, ItemSummary, Phase, Submission, TryOnFlow, TryOnOutcome};
pub use progress::{COMPLETE_STATUS, INITIAL_STATUS, ProgressMeter};
pub use relay_client::{CONNECT_FAILED, RelayClient, RelayClientError};

/// Stores a picked photo somewhere the relay can fetch it from.
#[async_trait]
pub trait PhotoUploader: Send + Sync {
    /// Upload the photo and return its public URL.
    async fn upload(&self, photo: &LocalImage) -> Result<Url, DataStoreError>;
}

/// Runs a try-on for two public image URLs.
#[async_trait]
pub trait TryOnRelay: Send + Sync {
    async fn generate(&self, request: &TryOnRequest) -> Result<TryOnSuccess, RelayClientError>;
}

/// Keeps a record of successful try-ons.
#[async_trait]
pub trait TryOnHistory: Send + Sync {
    /// Store one generation: the garment, the user's photo and the result.
    async fn record(&self, product_id: &ProductId, original: &Url, generated: &Url) -> Result<(), DataStoreError>;
}
