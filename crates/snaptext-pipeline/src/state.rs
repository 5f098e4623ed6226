//! Presentation state and its read-only view.
//!
//! `PresentationState` is owned by the presentation thread. Its setters are
//! crate-private: the image changes only when the host forwards an image
//! source result, and the outcome changes only when a pipeline completion is
//! applied. The display layer receives whole-state copies through
//! `StateView`, so a reader can never observe half of an update.

use std::thread::{self, ThreadId};

use tokio::sync::watch;

use snaptext_core::error::SnaptextError;
use snaptext_core::types::{Image, ImageId, InvocationId, PipelineOutcome};

/// What the display shows: the current image and the latest outcome.
#[derive(Debug, Clone, Default)]
pub struct PresentationState {
    current_image: Option<Image>,
    current_outcome: Option<PipelineOutcome>,
    last_writer: Option<InvocationId>,
    revision: u64,
    mutated_on: Option<ThreadId>,
}

impl PresentationState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make `image` current and clear any previous outcome.
    pub(crate) fn set_image(&mut self, image: Image) {
        self.current_image = Some(image);
        self.current_outcome = None;
        self.last_writer = None;
        self.touch();
    }

    /// Replace the outcome with the one produced by `invocation`.
    pub(crate) fn apply_outcome(&mut self, invocation: InvocationId, outcome: PipelineOutcome) {
        self.current_outcome = Some(outcome);
        self.last_writer = Some(invocation);
        self.touch();
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.mutated_on = Some(thread::current().id());
    }

    pub fn current_image(&self) -> Option<&Image> {
        self.current_image.as_ref()
    }

    pub fn current_image_id(&self) -> Option<ImageId> {
        self.current_image.as_ref().map(Image::id)
    }

    /// `None` until a recognition for the current image has been applied.
    pub fn current_outcome(&self) -> Option<&PipelineOutcome> {
        self.current_outcome.as_ref()
    }

    /// The invocation whose outcome is currently shown.
    pub fn last_writer(&self) -> Option<InvocationId> {
        self.last_writer
    }

    /// Number of mutations so far. Starts at 0.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Thread that performed the most recent mutation.
    pub fn mutated_on(&self) -> Option<ThreadId> {
        self.mutated_on
    }
}

/// Read-only access to the presentation state for the display layer.
#[derive(Debug, Clone)]
pub struct StateView {
    rx: watch::Receiver<PresentationState>,
}

impl StateView {
    pub(crate) fn new(rx: watch::Receiver<PresentationState>) -> Self {
        Self { rx }
    }

    /// Copy of the latest published state.
    pub fn current(&self) -> PresentationState {
        self.rx.borrow().clone()
    }

    /// Wait for the next mutation and return the state after it.
    ///
    /// Intermediate states may be skipped if several mutations land before
    /// the reader wakes up; the returned state is always a complete one.
    pub async fn changed(&mut self) -> Result<PresentationState, SnaptextError> {
        self.rx.changed().await.map_err(|_| {
            SnaptextError::Presentation("presentation thread stopped".to_string())
        })?;
        Ok(self.rx.borrow_and_update().clone())
    }
}
