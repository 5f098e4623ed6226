use serde::{Deserialize, Serialize};

use crate::types::{FailureReason, ImageId, ImageOrigin, InvocationId, Timestamp};

/// Why a completed recognition was not shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// A different image became current while the recognition was running.
    StaleImage,
    /// A newer invocation was started after this one.
    Superseded,
}

/// Domain events emitted by the presentation thread and the pipeline.
///
/// Events are informational: they never drive state. Consumers are the host
/// binary's event log and tests.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DomainEvent {
    /// A new image became the current image.
    ImageSelected {
        image_id: ImageId,
        origin: ImageOrigin,
        width: u32,
        height: u32,
        timestamp: Timestamp,
    },

    /// Recognition was dispatched to a background worker.
    RecognitionStarted {
        invocation: InvocationId,
        image_id: ImageId,
        timestamp: Timestamp,
    },

    /// A successful outcome was written to the presentation state.
    RecognitionApplied {
        invocation: InvocationId,
        image_id: ImageId,
        text_length: usize,
        timestamp: Timestamp,
    },

    /// A failure outcome was written to the presentation state.
    RecognitionFailed {
        invocation: InvocationId,
        image_id: ImageId,
        reason: FailureReason,
        timestamp: Timestamp,
    },

    /// A completed outcome was dropped instead of being shown.
    RecognitionDiscarded {
        invocation: InvocationId,
        image_id: ImageId,
        reason: DiscardReason,
        timestamp: Timestamp,
    },
}

impl DomainEvent {
    /// Short machine-readable name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::ImageSelected { .. } => "image_selected",
            DomainEvent::RecognitionStarted { .. } => "recognition_started",
            DomainEvent::RecognitionApplied { .. } => "recognition_applied",
            DomainEvent::RecognitionFailed { .. } => "recognition_failed",
            DomainEvent::RecognitionDiscarded { .. } => "recognition_discarded",
        }
    }

    /// The invocation this event belongs to, if any.
    pub fn invocation(&self) -> Option<InvocationId> {
        match self {
            DomainEvent::ImageSelected { .. } => None,
            DomainEvent::RecognitionStarted { invocation, .. }
            | DomainEvent::RecognitionApplied { invocation, .. }
            | DomainEvent::RecognitionFailed { invocation, .. }
            | DomainEvent::RecognitionDiscarded { invocation, .. } => Some(*invocation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_event_kind_and_invocation() {
        let event = DomainEvent::RecognitionDiscarded {
            invocation: InvocationId(3),
            image_id: ImageId::new(),
            reason: DiscardReason::StaleImage,
            timestamp: Utc::now(),
        };
        assert_eq!(event.kind(), "recognition_discarded");
        assert_eq!(event.invocation(), Some(InvocationId(3)));

        let selected = DomainEvent::ImageSelected {
            image_id: ImageId::new(),
            origin: ImageOrigin::Camera,
            width: 10,
            height: 20,
            timestamp: Utc::now(),
        };
        assert_eq!(selected.kind(), "image_selected");
        assert_eq!(selected.invocation(), None);
    }

    #[test]
    fn test_event_serializes_to_json() {
        let event = DomainEvent::RecognitionFailed {
            invocation: InvocationId(1),
            image_id: ImageId::new(),
            reason: FailureReason::Engine("boom".into()),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        let body = &json["RecognitionFailed"];
        assert_eq!(body["invocation"], 1);
        assert_eq!(body["reason"]["kind"], "engine");
        assert_eq!(body["reason"]["message"], "boom");
    }
}
