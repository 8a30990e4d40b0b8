//! Drives a [`TryOnFlow`] through the network calls of a submission.

use std::sync::Arc;
use std::time::Duration;

use fitroom_core::{CatalogItem, ProductId, TryOnRequest, TryOnResult};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::flow::{FlowError, Phase, Submission, TryOnFlow};
use super::{PhotoUploader, TryOnHistory, TryOnRelay};
use crate::datastore::{DataStoreClient, DataStoreError};

/// How often the progress meter advances while a submission runs.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Message shown when the photo could not be stored.
pub const UPLOAD_FAILED: &str = "Failed to upload photo";

/// Shared handle on one try-on page.
///
/// The flow sits behind a `tokio::sync::Mutex`. `submit` checks and sets the
/// `Submitting` phase under the lock and releases it before any network call,
/// so a second submit while one is running returns [`FlowError::Busy`].
///
/// Dropping a `submit` future stops its progress ticker and returns the flow
/// to `AwaitingSelection`.
#[derive(Clone)]
pub struct TryOnController {
    flow: Arc<Mutex<TryOnFlow>>,
    relay: Arc<dyn TryOnRelay>,
    uploader: Arc<dyn PhotoUploader>,
    history: Option<Arc<dyn TryOnHistory>>,
    tick_interval: Duration,
}

impl std::fmt::Debug for TryOnController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TryOnController")
            .field("tick_interval", &self.tick_interval)
            .field("records_history", &self.history.is_some())
            .finish_non_exhaustive()
    }
}

impl TryOnController {
    #[must_use]
    pub fn new(relay: Arc<dyn TryOnRelay>, uploader: Arc<dyn PhotoUploader>) -> Self {
        Self::with_flow(TryOnFlow::default(), relay, uploader)
    }

    /// Controller around an existing flow (e.g. one offering another category).
    #[must_use]
    pub fn with_flow(
        flow: TryOnFlow,
        relay: Arc<dyn TryOnRelay>,
        uploader: Arc<dyn PhotoUploader>,
    ) -> Self {
        Self {
            flow: Arc::new(Mutex::new(flow)),
            relay,
            uploader,
            history: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Record every successful try-on in `history`.
    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn TryOnHistory>) -> Self {
        self.history = Some(history);
        self
    }

    #[must_use]
    pub const fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Copy of the current flow state for rendering.
    pub async fn snapshot(&self) -> TryOnFlow {
        self.flow.lock().await.clone()
    }

    /// Validate a picked file and build its preview.
    ///
    /// # Errors
    ///
    /// See [`TryOnFlow::select_photo`].
    pub async fn select_photo(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), FlowError> {
        let mut flow = self.flow.lock().await;
        flow.select_photo(file_name, mime_type, bytes)?;
        flow.finish_preview()?;
        Ok(())
    }

    /// Replace the garment list.
    pub async fn set_catalog(&self, items: Vec<CatalogItem>) {
        self.flow.lock().await.load_catalog(items);
    }

    /// Fetch the try-on garment subset and load it into the flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog request fails.
    pub async fn load_catalog(&self, store: &DataStoreClient) -> Result<usize, DataStoreError> {
        let items = store.tryon_catalog().await?;
        let mut flow = self.flow.lock().await;
        flow.load_catalog(items);
        Ok(flow.catalog().len())
    }

    /// Pick a garment.
    ///
    /// # Errors
    ///
    /// See [`TryOnFlow::select_item`].
    pub async fn select_item(&self, id: &ProductId) -> Result<(), FlowError> {
        self.flow.lock().await.select_item(id).map(|_| ())
    }

    /// Upload the photo, call the relay, and record the outcome.
    ///
    /// Returns the phase the flow ended in (`Succeeded` or `Failed`). A
    /// success is also written to the try-on history, if one is attached;
    /// a history failure is logged and does not fail the try-on.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Busy`] if a submission is already running,
    /// [`FlowError::Incomplete`] without a photo and a garment, or
    /// [`FlowError::NotSubmitting`] if the flow was reset while this
    /// submission ran. A result dropped that way is not recorded.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> Result<Phase, FlowError> {
        let submission = self.flow.lock().await.begin_submit()?;
        info!(item = %submission.item.id, ticket = submission.ticket, "Try-on submitted");

        let mut guard = SubmissionGuard {
            flow: Arc::clone(&self.flow),
            ticket: submission.ticket,
            ticker: self.spawn_ticker(submission.ticket),
            armed: true,
        };
        let (result, person_image) = self.run(&submission).await;

        let phase = {
            let mut flow = self.flow.lock().await;
            guard.armed = false;
            flow.complete(submission.ticket, result).cloned()
        };
        drop(guard);

        if let (Ok(Phase::Succeeded(outcome)), Some(person_image)) = (&phase, person_image) {
            self.record(&outcome.item.id, &person_image, &outcome.result_url)
                .await;
        }
        phase
    }

    /// Discard all state.
    pub async fn reset(&self) {
        self.flow.lock().await.reset();
    }

    /// Returns the outcome and the uploaded photo's URL, if the upload got
    /// that far.
    async fn run(&self, submission: &Submission) -> (TryOnResult, Option<Url>) {
        let person_image = match self.uploader.upload(&submission.photo).await {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Photo upload failed");
                return (TryOnResult::failed(UPLOAD_FAILED), None);
            }
        };

        let request = TryOnRequest::new(person_image.clone(), submission.garment_url.clone());
        let result = match self.relay.generate(&request).await {
            Ok(success) => success.into(),
            Err(e) => {
                warn!(error = %e, "Try-on failed");
                TryOnResult::failed(e.user_message())
            }
        };
        (result, Some(person_image))
    }

    async fn record(&self, product_id: &ProductId, original: &Url, generated: &Url) {
        let Some(history) = &self.history else {
            return;
        };
        if let Err(e) = history.record(product_id, original, generated).await {
            warn!(error = %e, product_id = %product_id, "Failed to record try-on history");
        }
    }

    /// Advance progress until the submission holding `ticket` stops running.
    fn spawn_ticker(&self, ticket: u64) -> JoinHandle<()> {
        let flow = Arc::clone(&self.flow);
        let period = self.tick_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                let mut flow = flow.lock().await;
                if !flow.is_running(ticket) {
                    break;
                }
                flow.tick();
            }
        })
    }
}

/// Lives as long as one `submit` call.
///
/// Always stops the ticker. While armed (no result recorded yet) it also
/// abandons the submission, so a dropped `submit` does not leave the flow
/// stuck in `Submitting`.
struct SubmissionGuard {
    flow: Arc<Mutex<TryOnFlow>>,
    ticket: u64,
    ticker: JoinHandle<()>,
    armed: bool,
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        self.ticker.abort();
        if !self.armed {
            return;
        }

        let ticket = self.ticket;
        if let Ok(mut flow) = self.flow.try_lock() {
            if flow.abandon(ticket) {
                debug!(ticket, "Try-on submission abandoned");
            }
            return;
        }

        // Lock is busy; finish the cleanup on the runtime instead
        let flow = Arc::clone(&self.flow);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                if flow.lock().await.abandon(ticket) {
                    debug!(ticket, "Try-on submission abandoned");
                }
            });
        }
    }
}
