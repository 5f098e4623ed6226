//! SnapText Capture crate - image acquisition from the gallery or the camera.
//!
//! Provides the ImageSource trait, the `Selection` sum type that separates a
//! picked image from a cancelled picker, a MockImageSource for testing, and a
//! FileImageSource that decodes image files chosen through a host picker.

pub mod file_source;

use image::{DynamicImage, Rgb, RgbImage};

use snaptext_core::error::SnaptextError;
use snaptext_core::types::{Image, ImageOrigin};

pub use file_source::{FileImageSource, PathPicker};

/// What the user ended up doing with a picker.
#[derive(Debug, Clone)]
pub enum Selection {
    /// A new image is available.
    Image(Image),
    /// The user backed out, or permission was denied. Not an error.
    Cancelled,
}

impl Selection {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Selection::Cancelled)
    }

    /// The selected image, if any.
    pub fn into_image(self) -> Option<Image> {
        match self {
            Selection::Image(image) => Some(image),
            Selection::Cancelled => None,
        }
    }
}

/// Source of input images.
///
/// Both operations suspend until the user finishes with the picker; there is
/// no timeout. `Err` is reserved for images that were chosen but could not
/// be loaded.
pub trait ImageSource: Send + Sync {
    /// Let the user pick an existing image.
    fn select_from_gallery(
        &self,
    ) -> impl std::future::Future<Output = Result<Selection, SnaptextError>> + Send;

    /// Let the user take a photo.
    fn capture_from_camera(
        &self,
    ) -> impl std::future::Future<Output = Result<Selection, SnaptextError>> + Send;
}

#[derive(Debug, Clone)]
enum MockBehavior {
    Select { width: u32, height: u32 },
    Cancel,
    Fail(String),
}

/// Mock image source for testing.
///
/// Produces a fresh solid-colour bitmap (with a new `ImageId`) on every
/// call, or cancels / fails every time.
#[derive(Debug, Clone)]
pub struct MockImageSource {
    behavior: MockBehavior,
}

impl MockImageSource {
    /// A source that always yields a 64x32 image.
    pub fn new() -> Self {
        Self::with_dimensions(64, 32)
    }

    /// A source that always yields an image of the given size.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            behavior: MockBehavior::Select { width, height },
        }
    }

    /// A source whose picker is always dismissed.
    pub fn cancelling() -> Self {
        Self {
            behavior: MockBehavior::Cancel,
        }
    }

    /// A source that always fails to load the chosen image.
    pub fn failing(message: &str) -> Self {
        Self {
            behavior: MockBehavior::Fail(message.to_string()),
        }
    }

    fn pick(&self, origin: ImageOrigin) -> Result<Selection, SnaptextError> {
        match &self.behavior {
            MockBehavior::Select { width, height } => {
                let bitmap = RgbImage::from_pixel(*width, *height, Rgb([255, 255, 255]));
                Ok(Selection::Image(Image::new(
                    DynamicImage::ImageRgb8(bitmap),
                    origin,
                )))
            }
            MockBehavior::Cancel => Ok(Selection::Cancelled),
            MockBehavior::Fail(msg) => Err(SnaptextError::ImageLoad(msg.clone())),
        }
    }
}

impl Default for MockImageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageSource for MockImageSource {
    async fn select_from_gallery(&self) -> Result<Selection, SnaptextError> {
        self.pick(ImageOrigin::Gallery)
    }

    async fn capture_from_camera(&self) -> Result<Selection, SnaptextError> {
        self.pick(ImageOrigin::Camera)
    }
}
