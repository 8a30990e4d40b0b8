//! Try-on flow state machine.
//!
//! ```text
//! Idle ──select_photo──▶ Uploading ──finish_preview──▶ AwaitingSelection
//!                                                        │ select_item
//!                                                        ▼
//!                  Succeeded / Failed ◀──complete── Submitting ◀─begin_submit
//! ```
//!
//! A rejected photo leaves the phase unchanged and sets an inline message.
//! Only one submission may be in flight; `begin_submit` while submitting is
//! refused with [`FlowError::Busy`]. Each submission carries a ticket, and a
//! result is only accepted for the ticket of the running submission, so a
//! response that outlives a [`TryOnFlow::reset`] is dropped.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fitroom_core::{
    CatalogItem, Category, LocalImage, PhotoRejected, Price, ProductId, TryOnResult,
};
use thiserror::Error;
use url::Url;

use super::progress::ProgressMeter;

/// Message shown when the relay reports failure without any text.
pub const GENERIC_FAILURE: &str = "Generation failed";

/// Errors raised by flow transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// The picked file failed local validation.
    #[error(transparent)]
    Photo(#[from] PhotoRejected),

    /// No photo has been picked yet.
    #[error("Please choose a photo first")]
    NoPhoto,

    /// The item is not in the loaded catalog subset.
    #[error("Unknown catalog item: {0}")]
    UnknownItem(ProductId),

    /// A submission is already running.
    #[error("A try-on is already in progress")]
    Busy,

    /// Photo or garment missing.
    #[error("Please upload a photo and select a product")]
    Incomplete,

    /// The selected item has no usable image URL.
    #[error("Selected item has no valid image: {0}")]
    InvalidGarmentImage(String),

    /// A result arrived for a submission that is no longer running.
    #[error("No try-on is in progress")]
    NotSubmitting,
}

/// Display data of the garment a result was generated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSummary {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image_ref: String,
}

impl From<&CatalogItem> for ItemSummary {
    fn from(item: &CatalogItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            price: item.display_price(),
            image_ref: item.image_ref.clone(),
        }
    }
}

/// What the result view renders after a successful try-on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryOnOutcome {
    pub result_url: Url,
    pub original_preview: String,
    pub item: ItemSummary,
}

/// Current phase of the flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// A photo passed validation; the preview is being built.
    Uploading,
    /// Preview ready; waiting for a garment and a submit.
    AwaitingSelection,
    Submitting,
    Succeeded(TryOnOutcome),
    /// Human-readable error to display.
    Failed(String),
}

/// Everything needed to run one try-on, taken when submission starts.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Sequence number matched by [`TryOnFlow::complete`].
    pub ticket: u64,
    pub photo: LocalImage,
    pub garment_url: Url,
    pub item: ItemSummary,
}

/// Client-side state of the try-on page.
#[derive(Debug, Clone)]
pub struct TryOnFlow {
    phase: Phase,
    category: Category,
    photo: Option<LocalImage>,
    preview: Option<String>,
    photo_error: Option<String>,
    catalog: Vec<CatalogItem>,
    selected: Option<ProductId>,
    submitted: Option<ItemSummary>,
    progress: ProgressMeter,
    /// Ticket of the last submission; survives `reset`.
    ticket: u64,
}

impl Default for TryOnFlow {
    fn default() -> Self {
        Self::new(Category::clothing())
    }
}

impl TryOnFlow {
    /// Empty flow offering garments of `category`.
    #[must_use]
    pub fn new(category: Category) -> Self {
        Self {
            phase: Phase::Idle,
            category,
            photo: None,
            preview: None,
            photo_error: None,
            catalog: Vec::new(),
            selected: None,
            submitted: None,
            progress: ProgressMeter::new(),
            ticket: 0,
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Validate and keep a picked photo.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Busy`] while submitting, or [`FlowError::Photo`]
    /// if the file is not an image or is too large. A rejected file sets
    /// [`Self::photo_error`] and does not change the phase.
    pub fn select_photo(
        &mut self,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), FlowError> {
        if self.is_submitting() {
            return Err(FlowError::Busy);
        }

        match LocalImage::new(file_name, mime_type, bytes) {
            Ok(photo) => {
                self.photo = Some(photo);
                self.preview = None;
                self.photo_error = None;
                self.phase = Phase::Uploading;
                Ok(())
            }
            Err(rejected) => {
                self.photo_error = Some(rejected.to_string());
                Err(rejected.into())
            }
        }
    }

    /// Build the local `data:` URL preview of the picked photo.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::NoPhoto`] unless a photo was just picked.
    pub fn finish_preview(&mut self) -> Result<&str, FlowError> {
        if self.phase != Phase::Uploading {
            return Err(FlowError::NoPhoto);
        }
        let photo = self.photo.as_ref().ok_or(FlowError::NoPhoto)?;

        let data_url = format!(
            "data:{};base64,{}",
            photo.mime_type(),
            STANDARD.encode(photo.bytes())
        );
        self.phase = Phase::AwaitingSelection;
        Ok(self.preview.insert(data_url).as_str())
    }

    /// Replace the garment list, keeping only items of the flow's category.
    ///
    /// A selection that is no longer listed is dropped.
    pub fn load_catalog(&mut self, items: Vec<CatalogItem>) {
        self.catalog = items
            .into_iter()
            .filter(|item| item.is_in(&self.category))
            .collect();

        if let Some(selected) = &self.selected
            && !self.catalog.iter().any(|item| &item.id == selected)
        {
            self.selected = None;
        }
    }

    /// Pick a garment from the loaded catalog.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Busy`] while submitting, or
    /// [`FlowError::UnknownItem`] if `id` is not in the loaded catalog.
    pub fn select_item(&mut self, id: &ProductId) -> Result<&CatalogItem, FlowError> {
        if self.is_submitting() {
            return Err(FlowError::Busy);
        }

        let item = self
            .catalog
            .iter()
            .find(|item| &item.id == id)
            .ok_or_else(|| FlowError::UnknownItem(id.clone()))?;
        self.selected = Some(id.clone());
        Ok(item)
    }

    /// Enter `Submitting` and hand out what the submission needs.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Busy`] if a submission is already running,
    /// [`FlowError::Incomplete`] without a previewed photo and a selected
    /// garment, or [`FlowError::InvalidGarmentImage`] if the garment's image
    /// is not a URL.
    pub fn begin_submit(&mut self) -> Result<Submission, FlowError> {
        if self.is_submitting() {
            return Err(FlowError::Busy);
        }

        let (Some(photo), Some(_), Some(item)) =
            (self.photo.as_ref(), self.preview.as_ref(), self.selected_item())
        else {
            return Err(FlowError::Incomplete);
        };

        let garment_url = Url::parse(&item.image_ref)
            .map_err(|e| FlowError::InvalidGarmentImage(e.to_string()))?;
        let photo = photo.clone();
        let item = ItemSummary::from(item);
        self.ticket += 1;
        let submission = Submission {
            ticket: self.ticket,
            photo,
            garment_url,
            item,
        };

        self.submitted = Some(submission.item.clone());
        self.phase = Phase::Submitting;
        self.progress.start();
        Ok(submission)
    }

    /// Advance the progress meter while submitting.
    pub fn tick(&mut self) {
        if self.is_submitting() {
            self.progress.tick();
        }
    }

    /// Record the outcome of the submission holding `ticket`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::NotSubmitting`] unless that submission is the one
    /// running.
    pub fn complete(&mut self, ticket: u64, result: TryOnResult) -> Result<&Phase, FlowError> {
        if !self.is_running(ticket) {
            return Err(FlowError::NotSubmitting);
        }

        let item = self.submitted.take();
        self.phase = match (result.success, result.result_image_ref, item) {
            (true, Some(result_url), Some(item)) => {
                self.progress.complete();
                Phase::Succeeded(TryOnOutcome {
                    result_url,
                    original_preview: self.preview.clone().unwrap_or_default(),
                    item,
                })
            }
            _ => {
                self.progress.fail();
                Phase::Failed(
                    result
                        .error_message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
                )
            }
        };
        Ok(&self.phase)
    }

    /// Give up on the submission holding `ticket` without a result.
    ///
    /// The photo and selection are kept so the user can submit again.
    /// Returns whether the flow changed.
    pub fn abandon(&mut self, ticket: u64) -> bool {
        if !self.is_running(ticket) {
            return false;
        }
        self.submitted = None;
        self.progress = ProgressMeter::new();
        self.phase = Phase::AwaitingSelection;
        true
    }

    /// Discard everything, as on navigation away.
    pub fn reset(&mut self) {
        let ticket = self.ticket;
        *self = Self::new(self.category.clone());
        self.ticket = ticket;
    }


    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub const fn phase(&self) -> &Phase {
        &self.phase
    }

    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self.phase, Phase::Submitting)
    }

    /// Whether the submission holding `ticket` is the one running.
    #[must_use]
    pub const fn is_running(&self, ticket: u64) -> bool {
        self.is_submitting() && self.ticket == ticket
    }

    /// Whether a submit would start a request now.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.is_submitting()
            && self.photo.is_some()
            && self.preview.is_some()
            && self.selected_item().is_some()
    }

    #[must_use]
    pub const fn progress(&self) -> &ProgressMeter {
        &self.progress
    }

    /// Inline message for the last rejected photo.
    #[must_use]
    pub fn photo_error(&self) -> Option<&str> {
        self.photo_error.as_deref()
    }

    #[must_use]
    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    #[must_use]
    pub fn catalog(&self) -> &[CatalogItem] {
        &self.catalog
    }

    #[must_use]
    pub fn selected_item(&self) -> Option<&CatalogItem> {
        let selected = self.selected.as_ref()?;
        self.catalog.iter().find(|item| &item.id == selected)
    }
}
