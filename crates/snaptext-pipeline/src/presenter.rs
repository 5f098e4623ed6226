//! The presentation thread.
//!
//! A single dedicated OS thread owns the `PresentationState` and processes
//! messages in arrival order: image selections from the host and
//! completions from background recognitions. Every mutation happens here,
//! so no two mutations can interleave. After each mutation the whole state
//! is published to `StateView` readers.

use std::thread::{self, JoinHandle, ThreadId};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use snaptext_core::config::{PipelineConfig, SupersedePolicy};
use snaptext_core::error::SnaptextError;
use snaptext_core::events::{DiscardReason, DomainEvent};
use snaptext_core::types::{Image, ImageId, InvocationId, PipelineOutcome};

use crate::state::{PresentationState, StateView};

const PRESENTATION_THREAD_NAME: &str = "snaptext-presentation";
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What happened to a completed outcome on the presentation thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The outcome was written to the presentation state.
    Applied,
    /// The outcome was dropped.
    Discarded(DiscardReason),
}

/// Final report for one pipeline invocation.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub invocation: InvocationId,
    pub image_id: ImageId,
    pub outcome: PipelineOutcome,
    pub disposition: Disposition,
}

impl Delivery {
    pub fn is_applied(&self) -> bool {
        self.disposition == Disposition::Applied
    }
}

/// An outcome travelling from a worker back to the presentation thread.
#[derive(Debug)]
pub(crate) struct Completion {
    pub invocation: InvocationId,
    pub image_id: ImageId,
    pub outcome: PipelineOutcome,
    pub reply: oneshot::Sender<Delivery>,
}

#[derive(Debug)]
pub(crate) enum PresentationMessage {
    SelectImage {
        image: Image,
        ack: oneshot::Sender<PresentationState>,
    },
    Started {
        invocation: InvocationId,
        image_id: ImageId,
    },
    Completed(Completion),
    Shutdown,
}

/// Cloneable handle used to talk to the presentation thread.
#[derive(Debug, Clone)]
pub struct PresenterHandle {
    tx: mpsc::UnboundedSender<PresentationMessage>,
    state: watch::Receiver<PresentationState>,
    events: broadcast::Sender<DomainEvent>,
}

impl PresenterHandle {
    /// Make `image` the current image, clearing the previous outcome.
    ///
    /// Resolves once the presentation thread has applied the change and
    /// returns the resulting state.
    pub async fn select_image(&self, image: Image) -> Result<PresentationState, SnaptextError> {
        let (ack, done) = oneshot::channel();
        self.send(PresentationMessage::SelectImage { image, ack })?;
        done.await.map_err(|_| {
            SnaptextError::Presentation("presentation thread dropped the selection".to_string())
        })
    }

    /// Read-only view for the display layer.
    pub fn view(&self) -> StateView {
        StateView::new(self.state.clone())
    }

    /// Copy of the latest published state.
    pub fn current(&self) -> PresentationState {
        self.state.borrow().clone()
    }

    /// Subscribe to domain events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    /// Ask the presentation thread to stop after the messages already queued.
    pub fn shutdown(&self) {
        if self.tx.send(PresentationMessage::Shutdown).is_err() {
            debug!("Presentation thread already stopped");
        }
    }

    pub(crate) fn send(&self, message: PresentationMessage) -> Result<(), SnaptextError> {
        self.tx.send(message).map_err(|_| SnaptextError::ShuttingDown)
    }
}

/// Join handle of the presentation thread.
#[derive(Debug)]
pub struct PresenterThread {
    handle: JoinHandle<()>,
}

impl PresenterThread {
    pub fn thread_id(&self) -> ThreadId {
        self.handle.thread().id()
    }

    /// Wait for the thread to exit. Call `PresenterHandle::shutdown` first,
    /// or drop every handle.
    pub fn join(self) -> Result<(), SnaptextError> {
        self.handle.join().map_err(|_| {
            SnaptextError::Presentation("presentation thread panicked".to_string())
        })
    }
}

/// Starts the presentation thread.
pub struct Presenter;

impl Presenter {
    /// Spawn the presentation thread with an empty state.
    pub fn spawn(config: PipelineConfig) -> Result<(PresenterHandle, PresenterThread), SnaptextError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(PresentationState::new());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let worker_events = events.clone();
        let handle = thread::Builder::new()
            .name(PRESENTATION_THREAD_NAME.to_string())
            .spawn(move || {
                PresentationLoop {
                    state: PresentationState::new(),
                    latest_started: None,
                    config,
                    publisher: state_tx,
                    events: worker_events,
                }
                .run(rx)
            })?;

        info!(thread = PRESENTATION_THREAD_NAME, "Presentation thread started");

        Ok((
            PresenterHandle {
                tx,
                state: state_rx,
                events,
            },
            PresenterThread { handle },
        ))
    }
}

struct PresentationLoop {
    state: PresentationState,
    latest_started: Option<InvocationId>,
    config: PipelineConfig,
    publisher: watch::Sender<PresentationState>,
    events: broadcast::Sender<DomainEvent>,
}

impl PresentationLoop {
    fn run(mut self, mut rx: mpsc::UnboundedReceiver<PresentationMessage>) {
        while let Some(message) = rx.blocking_recv() {
            match message {
                PresentationMessage::SelectImage { image, ack } => {
                    self.select_image(image);
                    // The host may have stopped waiting.
                    let _ = ack.send(self.state.clone());
                }
                PresentationMessage::Started {
                    invocation,
                    image_id,
                } => self.record_start(invocation, image_id),
                PresentationMessage::Completed(completion) => self.complete(completion),
                PresentationMessage::Shutdown => break,
            }
        }
        debug!("Presentation thread stopped");
    }

    fn select_image(&mut self, image: Image) {
        let event = DomainEvent::ImageSelected {
            image_id: image.id(),
            origin: image.origin(),
            width: image.width(),
            height: image.height(),
            timestamp: Utc::now(),
        };
        info!(image_id = %image.id(), origin = %image.origin(), "Current image replaced");
        self.state.set_image(image);
        self.publish();
        self.emit(event);
    }

    fn record_start(&mut self, invocation: InvocationId, image_id: ImageId) {
        if self.latest_started.map_or(true, |latest| invocation > latest) {
            self.latest_started = Some(invocation);
        }
        self.emit(DomainEvent::RecognitionStarted {
            invocation,
            image_id,
            timestamp: Utc::now(),
        });
    }

    fn complete(&mut self, completion: Completion) {
        let Completion {
            invocation,
            image_id,
            outcome,
            reply,
        } = completion;

        let disposition = self.disposition_for(invocation, image_id);
        match disposition {
            Disposition::Applied => {
                let event = match &outcome {
                    PipelineOutcome::Success { text } => DomainEvent::RecognitionApplied {
                        invocation,
                        image_id,
                        text_length: text.len(),
                        timestamp: Utc::now(),
                    },
                    PipelineOutcome::Failure(reason) => DomainEvent::RecognitionFailed {
                        invocation,
                        image_id,
                        reason: reason.clone(),
                        timestamp: Utc::now(),
                    },
                };
                self.state.apply_outcome(invocation, outcome.clone());
                self.publish();
                debug!(%invocation, %image_id, "Outcome applied");
                self.emit(event);
            }
            Disposition::Discarded(reason) => {
                warn!(%invocation, %image_id, ?reason, "Outcome discarded");
                self.emit(DomainEvent::RecognitionDiscarded {
                    invocation,
                    image_id,
                    reason,
                    timestamp: Utc::now(),
                });
            }
        }

        let _ = reply.send(Delivery {
            invocation,
            image_id,
            outcome,
            disposition,
        });
    }

    fn disposition_for(&self, invocation: InvocationId, image_id: ImageId) -> Disposition {
        if self.config.discard_stale_images && self.state.current_image_id() != Some(image_id) {
            return Disposition::Discarded(DiscardReason::StaleImage);
        }
        if self.config.supersede_policy == SupersedePolicy::LatestInvocation
            && self.latest_started.is_some_and(|latest| latest > invocation)
        {
            return Disposition::Discarded(DiscardReason::Superseded);
        }
        Disposition::Applied
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }

    fn emit(&self, event: DomainEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
