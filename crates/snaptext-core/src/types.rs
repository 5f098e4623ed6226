use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Timestamp alias used across the workspace.
pub type Timestamp = DateTime<Utc>;

// =============================================================================
// Identifiers
// =============================================================================

/// Unique identity of an acquired image.
///
/// Two `Image` values compare as the same picture only if their ids match,
/// regardless of pixel content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(Uuid);

impl ImageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token identifying one call to the recognition pipeline.
///
/// Tokens are issued in increasing order, so a larger id was started later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InvocationId(pub u64);

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Image
// =============================================================================

/// Where an image came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOrigin {
    /// Picked from the photo library / file system.
    Gallery,
    /// Captured with the camera.
    Camera,
}

impl fmt::Display for ImageOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageOrigin::Gallery => write!(f, "gallery"),
            ImageOrigin::Camera => write!(f, "camera"),
        }
    }
}

/// A decoded bitmap acquired from an image source.
///
/// Cloning is cheap: the pixel buffer is shared.
#[derive(Clone)]
pub struct Image {
    id: ImageId,
    origin: ImageOrigin,
    acquired_at: Timestamp,
    bitmap: Arc<DynamicImage>,
}

impl Image {
    /// Wrap an already decoded bitmap.
    pub fn new(bitmap: DynamicImage, origin: ImageOrigin) -> Self {
        Self {
            id: ImageId::new(),
            origin,
            acquired_at: Utc::now(),
            bitmap: Arc::new(bitmap),
        }
    }

    /// Decode an encoded image (PNG, JPEG, BMP, ...) into a bitmap.
    pub fn from_encoded(bytes: &[u8], origin: ImageOrigin) -> Result<Self> {
        let bitmap = image::load_from_memory(bytes)?;
        Ok(Self::new(bitmap, origin))
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn origin(&self) -> ImageOrigin {
        self.origin
    }

    pub fn acquired_at(&self) -> Timestamp {
        self.acquired_at
    }

    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    /// Pixel dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn bitmap(&self) -> &DynamicImage {
        &self.bitmap
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("dimensions", &self.dimensions())
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}

// =============================================================================
// Recognition results
// =============================================================================

/// Axis-aligned region of a detected text block, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One ranked reading of a text region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecognizedCandidate {
    pub text: String,
    /// Engine confidence in `0.0..=1.0`.
    pub confidence: f32,
}

/// A detected text region and its candidate readings, best first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextObservation {
    pub candidates: Vec<RecognizedCandidate>,
    pub bounds: Option<BoundingBox>,
}

impl TextObservation {
    /// Observation with a single candidate.
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            candidates: vec![RecognizedCandidate {
                text: text.into(),
                confidence: confidence.clamp(0.0, 1.0),
            }],
            bounds: None,
        }
    }

    /// Attach the region the text was found in.
    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// The top-ranked candidate string, if the engine produced any.
    pub fn best_candidate(&self) -> Option<&str> {
        self.candidates.first().map(|c| c.text.as_str())
    }

    /// Confidence of the top-ranked candidate.
    pub fn confidence(&self) -> Option<f32> {
        self.candidates.first().map(|c| c.confidence)
    }
}

/// Observations in the order the engine reported them.
///
/// Reading order is whatever the engine produced; nothing here re-sorts it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub observations: Vec<TextObservation>,
}

impl RecognitionResult {
    pub fn new(observations: Vec<TextObservation>) -> Self {
        Self { observations }
    }

    /// Build a result from plain lines, one observation per line at full confidence.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        Self::new(
            lines
                .iter()
                .map(|line| TextObservation::new(line.as_ref(), 1.0))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Join every observation's best candidate with newlines.
    ///
    /// Observations without any candidate are skipped.
    pub fn joined_text(&self) -> String {
        self.observations
            .iter()
            .filter_map(TextObservation::best_candidate)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Why an invocation of the pipeline failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum FailureReason {
    /// The image could not be converted to the engine's representation.
    ImageDecode(String),
    /// The recognition engine reported an error.
    Engine(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ImageDecode(msg) => write!(f, "Could not read the image: {}", msg),
            FailureReason::Engine(msg) => write!(f, "Text recognition failed: {}", msg),
        }
    }
}

/// Result of one pipeline invocation, as shown to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    Success { text: String },
    Failure(FailureReason),
}

impl PipelineOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        PipelineOutcome::Success { text: text.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success { .. })
    }

    /// Recognized text, if the invocation succeeded.
    pub fn text(&self) -> Option<&str> {
        match self {
            PipelineOutcome::Success { text } => Some(text),
            PipelineOutcome::Failure(_) => None,
        }
    }
}
