//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::tryon::{BucketStore, FetchError, GradioClient, HttpImageSource, TryOnPipeline};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds no mutable request state; the only
/// shared mutable value is the object-name sequencer inside the pipeline.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RelayConfig,
    pipeline: TryOnPipeline,
}

impl AppState {
    /// Create state wired to the real HTTP adapters.
    ///
    /// # Errors
    ///
    /// Returns an error if the image fetch client cannot be built.
    pub fn new(config: RelayConfig) -> Result<Self, FetchError> {
        let source = HttpImageSource::new(&config.limits)?;
        let inference = GradioClient::new(&config.inference, config.limits.inference_timeout);
        let store = BucketStore::new(&config.storage);

        let pipeline = TryOnPipeline::new(Arc::new(source), Arc::new(inference), Arc::new(store));
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Create state around an already assembled pipeline.
    #[must_use]
    pub fn with_pipeline(config: RelayConfig, pipeline: TryOnPipeline) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pipeline }),
        }
    }

    /// Get a reference to the relay configuration.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    /// Get a reference to the try-on pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &TryOnPipeline {
        &self.inner.pipeline
    }
}
