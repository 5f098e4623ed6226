//! Conversion of acquired images into the engine's input representation.
//!
//! Engines consume 8-bit grayscale. Preparation is cheap compared to
//! recognition and runs on the caller's thread, before any hand-off.

use image::{DynamicImage, GrayImage};
use tracing::debug;

use snaptext_core::config::RecognitionConfig;
use snaptext_core::error::SnaptextError;
use snaptext_core::types::{Image, ImageId};

/// Grayscale bitmap ready for a recognition engine.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    source_id: ImageId,
    luma: GrayImage,
}

impl PreparedImage {
    /// Id of the image this was prepared from.
    pub fn source_id(&self) -> ImageId {
        self.source_id
    }

    pub fn width(&self) -> u32 {
        self.luma.width()
    }

    pub fn height(&self) -> u32 {
        self.luma.height()
    }

    pub fn luma(&self) -> &GrayImage {
        &self.luma
    }

    /// Encode as a 32-bit BMP, the format platform decoders accept everywhere.
    pub fn to_bmp(&self) -> Result<Vec<u8>, SnaptextError> {
        let rgba = DynamicImage::ImageLuma8(self.luma.clone()).to_rgba8();
        let mut buf = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut buf, image::ImageFormat::Bmp)
            .map_err(|e| SnaptextError::ImageDecode(format!("BMP encoding failed: {}", e)))?;
        Ok(buf.into_inner())
    }
}

/// Convert `image` into the engine representation.
///
/// Fails with `SnaptextError::ImageDecode` when the bitmap is empty or
/// larger than `config.max_image_pixels`.
pub fn prepare(image: &Image, config: &RecognitionConfig) -> Result<PreparedImage, SnaptextError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(SnaptextError::ImageDecode(format!(
            "image has no pixels ({}x{})",
            width, height
        )));
    }

    let pixels = u64::from(width) * u64::from(height);
    if pixels > config.max_image_pixels {
        return Err(SnaptextError::ImageDecode(format!(
            "image is {}x{} ({} pixels), limit is {}",
            width, height, pixels, config.max_image_pixels
        )));
    }

    let luma = image.bitmap().to_luma8();
    debug!(image_id = %image.id(), width, height, "Image prepared for recognition");

    Ok(PreparedImage {
        source_id: image.id(),
        luma,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use snaptext_core::types::ImageOrigin;

    fn test_image(w: u32, h: u32) -> Image {
        Image::new(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 200, 200]))),
            ImageOrigin::Gallery,
        )
    }

    #[test]
    fn test_prepare_converts_to_grayscale() {
        let img = test_image(30, 20);
        let prepared = prepare(&img, &RecognitionConfig::default()).unwrap();
        assert_eq!(prepared.source_id(), img.id());
        assert_eq!((prepared.width(), prepared.height()), (30, 20));
        assert_eq!(prepared.luma().get_pixel(0, 0).0[0], 200);
    }

    #[test]
    fn test_prepare_rejects_empty_bitmap() {
        let err = prepare(&test_image(0, 10), &RecognitionConfig::default()).unwrap_err();
        assert!(matches!(err, SnaptextError::ImageDecode(_)));
        assert!(err.to_string().contains("0x10"));
    }

    #[test]
    fn test_prepare_rejects_oversized_bitmap() {
        let config = RecognitionConfig {
            max_image_pixels: 99,
            ..RecognitionConfig::default()
        };
        let err = prepare(&test_image(10, 10), &config).unwrap_err();
        assert!(matches!(err, SnaptextError::ImageDecode(_)));
        assert!(err.to_string().contains("limit is 99"));
    }

    #[test]
    fn test_prepare_accepts_exact_limit() {
        let config = RecognitionConfig {
            max_image_pixels: 100,
            ..RecognitionConfig::default()
        };
        assert!(prepare(&test_image(10, 10), &config).is_ok());
    }

    #[test]
    fn test_to_bmp_is_decodable() {
        let prepared = prepare(&test_image(5, 3), &RecognitionConfig::default()).unwrap();
        let bmp = prepared.to_bmp().unwrap();
        assert_eq!(&bmp[..2], b"BM");
        let decoded = image::load_from_memory(&bmp).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 3));
    }
}
