//! The try-on pipeline.
//!
//! A request runs five sequential steps. Any failure aborts the request; there
//! are no retries.
//!
//! | Step | Port | Failure |
//! |------|------|---------|
//! | fetch person, then garment | [`ImageSource`] | `ImageTooLarge` / `SourceImage` |
//! | compose | [`InferenceProvider`] | `UpstreamUnavailable` / `Inference` |
//! | fetch result | [`ImageSource`] | `ResultImage` |
//! | write `tryon_<ms>.png` | [`ObjectStore`] | `StorageWriteFailure` |
//! | resolve public URL | [`ObjectStore`] | `Unknown` |

mod fetch;
mod inference;
mod naming;
mod storage;

use std::sync::Arc;

use fitroom_core::TryOnRequest;
use tracing::{info, instrument};
use url::Url;

use crate::error::RelayError;

pub use fetch::{FetchError, HttpImageSource, ImageBlob, ImageSource};
pub use inference::{
    GradioClient, InferenceError, InferenceProvider, SseEvent, TryOnParams, parse_events,
    terminal_outputs,
};
pub use naming::ObjectNamer;
pub use storage::{BucketStore, ObjectStore, StorageError};

/// Content type of every stored result.
pub const RESULT_CONTENT_TYPE: &str = "image/png";

/// Runs try-ons against the configured adapters.
#[derive(Clone)]
pub struct TryOnPipeline {
    source: Arc<dyn ImageSource>,
    inference: Arc<dyn InferenceProvider>,
    store: Arc<dyn ObjectStore>,
    namer: Arc<ObjectNamer>,
}

impl TryOnPipeline {
    #[must_use]
    pub fn new(
        source: Arc<dyn ImageSource>,
        inference: Arc<dyn InferenceProvider>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            source,
            inference,
            store,
            namer: Arc::new(ObjectNamer::new()),
        }
    }

    /// Compose the two images and return the public URL of the stored result.
    ///
    /// # Errors
    ///
    /// Returns the [`RelayError`] of the first step that fails.
    #[instrument(skip(self, request), fields(person = %request.person_image, garment = %request.garment_image))]
    pub async fn run(&self, request: &TryOnRequest) -> Result<Url, RelayError> {
        let person = self
            .source
            .fetch(&request.person_image)
            .await
            .map_err(source_error)?;
        let garment = self
            .source
            .fetch(&request.garment_image)
            .await
            .map_err(source_error)?;

        let result_url = self
            .inference
            .try_on(&person, &garment)
            .await
            .map_err(|e| {
                if e.is_unavailable() {
                    RelayError::UpstreamUnavailable(e)
                } else {
                    RelayError::Inference(e)
                }
            })?;

        let result = self
            .source
            .fetch(&result_url)
            .await
            .map_err(RelayError::ResultImage)?;

        let name = self.namer.next_name();
        self.store
            .put(&name, result.bytes, RESULT_CONTENT_TYPE)
            .await
            .map_err(RelayError::StorageWriteFailure)?;

        let url = self
            .store
            .public_url(&name)
            .map_err(|e| RelayError::Unknown(e.to_string()))?;

        info!(object = %name, "Try-on stored");
        Ok(url)
    }
}

fn source_error(err: FetchError) -> RelayError {
    match err {
        FetchError::TooLarge { limit, .. } => RelayError::ImageTooLarge { limit },
        other => RelayError::SourceImage(other),
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::*;
    use super::*;

    fn request() -> TryOnRequest {
        TryOnRequest::new(Url::parse(PERSON).unwrap(), Url::parse(GARMENT).unwrap())
    }

    #[tokio::test]
    async fn test_run_stores_result() {
        let store = Arc::new(MemoryStore::default());
        let pipeline = TryOnPipeline::new(
            Arc::new(healthy_source()),
            Arc::new(FakeInference::returning(result_url)),
            store.clone(),
        );

        let url = pipeline.run(&request()).await.unwrap();

        let objects = store.objects.lock().unwrap().clone();
        assert_eq!(objects.len(), 1);
        let (name, size, content_type) = &objects[0];
        assert!(name.starts_with("tryon_") && name.ends_with(".png"));
        assert_eq!(*size, b"result-png".len());
        assert_eq!(content_type, "image/png");
        assert_eq!(url.as_str(), format!("https://store.test/public/{name}"));
    }

    #[tokio::test]
    async fn test_identical_requests_store_two_objects() {
        let store = Arc::new(MemoryStore::default());
        let pipeline = TryOnPipeline::new(
            Arc::new(healthy_source()),
            Arc::new(FakeInference::returning(result_url)),
            store.clone(),
        );

        let first = pipeline.run(&request()).await.unwrap();
        let second = pipeline.run(&request()).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.objects.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_busy_provider_is_unavailable() {
        let pipeline = TryOnPipeline::new(
            Arc::new(healthy_source()),
            Arc::new(FakeInference::returning(|| {
                Err(InferenceError::Busy("You have exceeded your GPU quota".to_string()))
            })),
            Arc::new(MemoryStore::default()),
        );

        let err = pipeline.run(&request()).await.unwrap_err();
        assert!(matches!(err, RelayError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_rejected_inference_is_failed() {
        let pipeline = TryOnPipeline::new(
            Arc::new(healthy_source()),
            Arc::new(FakeInference::returning(|| {
                Err(InferenceError::Rejected("no person detected".to_string()))
            })),
            Arc::new(MemoryStore::default()),
        );

        let err = pipeline.run(&request()).await.unwrap_err();
        assert!(matches!(err, RelayError::Inference(_)));
        assert_eq!(err.label(), "Failed");
    }

    #[tokio::test]
    async fn test_oversized_source_stops_before_inference() {
        let mut source = healthy_source();
        source.too_large.push(PERSON.to_string());
        let inference = Arc::new(FakeInference::returning(result_url));
        let pipeline = TryOnPipeline::new(
            Arc::new(source),
            inference.clone(),
            Arc::new(MemoryStore::default()),
        );

        let err = pipeline.run(&request()).await.unwrap_err();
        assert!(matches!(err, RelayError::ImageTooLarge { .. }));
        assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_garment_is_source_error() {
        let source = FakeSource::with(&[(PERSON, b"person")]);
        let pipeline = TryOnPipeline::new(
            Arc::new(source),
            Arc::new(FakeInference::returning(result_url)),
            Arc::new(MemoryStore::default()),
        );

        let err = pipeline.run(&request()).await.unwrap_err();
        assert!(matches!(err, RelayError::SourceImage(FetchError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_storage_rejection() {
        let pipeline = TryOnPipeline::new(
            Arc::new(healthy_source()),
            Arc::new(FakeInference::returning(result_url)),
            Arc::new(MemoryStore {
                reject: true,
                ..MemoryStore::default()
            }),
        );

        let err = pipeline.run(&request()).await.unwrap_err();
        assert!(matches!(err, RelayError::StorageWriteFailure(_)));
    }
}
