//! The recognition pipeline.
//!
//! `run` prepares the image on the caller's thread, hands recognition to the
//! tokio blocking pool and sends the outcome back to the presentation thread
//! as a message. Only dispatched work is announced as started; an image that
//! fails preparation goes straight to a failure outcome. The caller is never
//! blocked on recognition; it gets an `Invocation` it may await for the
//! final `Delivery`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use snaptext_core::config::RecognitionConfig;
use snaptext_core::error::SnaptextError;
use snaptext_core::types::{FailureReason, Image, ImageId, InvocationId, PipelineOutcome};
use snaptext_ocr::{prepare, RecognitionEngine};

use crate::presenter::{Completion, Delivery, PresentationMessage, PresenterHandle};

/// A running (or finished) pipeline invocation.
#[derive(Debug)]
pub struct Invocation {
    id: InvocationId,
    image_id: ImageId,
    reply: oneshot::Receiver<Delivery>,
}

impl Invocation {
    pub fn id(&self) -> InvocationId {
        self.id
    }

    pub fn image_id(&self) -> ImageId {
        self.image_id
    }

    /// Wait until the presentation thread has applied or discarded the outcome.
    pub async fn delivered(self) -> Result<Delivery, SnaptextError> {
        self.reply.await.map_err(|_| {
            SnaptextError::Presentation(
                "presentation thread stopped before delivering the outcome".to_string(),
            )
        })
    }
}

/// Orchestrates image preparation, background recognition and delivery of
/// the outcome to the presentation thread.
pub struct RecognitionPipeline<E> {
    engine: Arc<E>,
    presenter: PresenterHandle,
    config: RecognitionConfig,
    runtime: Handle,
    next_invocation: AtomicU64,
}

impl<E> std::fmt::Debug for RecognitionPipeline<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionPipeline")
            .field("config", &self.config)
            .field("next_invocation", &self.next_invocation)
            .finish_non_exhaustive()
    }
}

impl<E: RecognitionEngine + 'static> RecognitionPipeline<E> {
    /// Create a pipeline that runs recognitions on the current tokio runtime.
    ///
    /// Fails when called outside a tokio runtime.
    pub fn new(
        engine: E,
        presenter: PresenterHandle,
        config: RecognitionConfig,
    ) -> Result<Self, SnaptextError> {
        let runtime = Handle::try_current().map_err(|e| {
            SnaptextError::Config(format!("RecognitionPipeline needs a tokio runtime: {}", e))
        })?;
        Ok(Self {
            engine: Arc::new(engine),
            presenter,
            config,
            runtime,
            next_invocation: AtomicU64::new(1),
        })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Recognize text in `image` and deliver the outcome to the presentation state.
    ///
    /// Returns `Ok(None)` without touching any state when there is no image.
    /// Errors only if the presentation thread has stopped.
    pub fn run(&self, image: Option<Image>) -> Result<Option<Invocation>, SnaptextError> {
        let Some(image) = image else {
            debug!("No image to recognize");
            return Ok(None);
        };

        let invocation = InvocationId(self.next_invocation.fetch_add(1, Ordering::SeqCst));
        let image_id = image.id();
        let (reply, delivered) = oneshot::channel();
        match prepare(&image, &self.config) {
            Err(e) => {
                warn!(%invocation, %image_id, error = %e, "Image preparation failed");
                self.presenter
                    .send(PresentationMessage::Completed(Completion {
                        invocation,
                        image_id,
                        outcome: PipelineOutcome::Failure(FailureReason::ImageDecode(detail(e))),
                        reply,
                    }))?;
            }
            Ok(prepared) => {
                info!(
                    %invocation,
                    %image_id,
                    width = prepared.width(),
                    height = prepared.height(),
                    "Recognition dispatched"
                );
                self.presenter.send(PresentationMessage::Started {
                    invocation,
                    image_id,
                })?;
                let engine = Arc::clone(&self.engine);
                let presenter = self.presenter.clone();
                self.runtime.spawn(async move {
                    let started = Instant::now();
                    let result =
                        tokio::task::spawn_blocking(move || engine.recognize(&prepared)).await;
                    let outcome = match result {
                        Ok(Ok(recognized)) => PipelineOutcome::success(recognized.joined_text()),
                        Ok(Err(e)) => PipelineOutcome::Failure(FailureReason::Engine(detail(e))),
                        Err(e) => PipelineOutcome::Failure(FailureReason::Engine(format!(
                            "recognition task panicked: {}",
                            e
                        ))),
                    };
                    info!(
                        %invocation,
                        success = outcome.is_success(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Recognition finished"
                    );

                    let completion = Completion {
                        invocation,
                        image_id,
                        outcome,
                        reply,
                    };
                    if let Err(e) = presenter.send(PresentationMessage::Completed(completion)) {
                        warn!(%invocation, error = %e, "Presentation thread gone, outcome dropped");
                    }
                });
            }
        }

        Ok(Some(Invocation {
            id: invocation,
            image_id,
            reply: delivered,
        }))
    }
}

/// The message carried by an error, without the variant prefix.
fn detail(err: SnaptextError) -> String {
    match err {
        SnaptextError::ImageDecode(msg) | SnaptextError::Engine(msg) => msg,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presenter::Presenter;
    use image::{DynamicImage, RgbImage};
    use snaptext_core::config::PipelineConfig;
    use snaptext_core::types::ImageOrigin;
    use snaptext_ocr::MockRecognitionEngine;

    #[test]
    fn test_detail_strips_prefix() {
        assert_eq!(detail(SnaptextError::Engine("boom".into())), "boom");
        assert_eq!(detail(SnaptextError::ImageDecode("empty".into())), "empty");
        assert_eq!(
            detail(SnaptextError::ShuttingDown),
            "Shutdown in progress"
        );
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let (handle, thread) = Presenter::spawn(PipelineConfig::default()).unwrap();
        let result = RecognitionPipeline::new(
            MockRecognitionEngine::new(),
            handle.clone(),
            RecognitionConfig::default(),
        );
        assert!(matches!(result, Err(SnaptextError::Config(_))));
        handle.shutdown();
        thread.join().unwrap();
    }

    #[tokio::test]
    async fn test_invocation_ids_increase() {
        let (handle, thread) = Presenter::spawn(PipelineConfig::default()).unwrap();
        let pipeline = RecognitionPipeline::new(
            MockRecognitionEngine::new(),
            handle.clone(),
            RecognitionConfig::default(),
        )
        .unwrap();
        let image = Image::new(
            DynamicImage::ImageRgb8(RgbImage::new(4, 4)),
            ImageOrigin::Gallery,
        );
        handle.select_image(image.clone()).await.unwrap();

        let first = pipeline.run(Some(image.clone())).unwrap().unwrap();
        let second = pipeline.run(Some(image)).unwrap().unwrap();
        assert_eq!(first.id(), InvocationId(1));
        assert_eq!(second.id(), InvocationId(2));
        first.delivered().await.unwrap();
        second.delivered().await.unwrap();

        handle.shutdown();
        thread.join().unwrap();
    }
}
