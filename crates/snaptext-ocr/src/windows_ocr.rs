//! Windows recognition engine via the `Windows.Media.Ocr` WinRT API.
//!
//! The prepared grayscale bitmap is re-encoded as BMP, decoded into a
//! `SoftwareBitmap` and passed to the system OCR engine. Each recognised
//! line becomes one observation. On other platforms every call returns
//! `SnaptextError::Engine`.

#[cfg(target_os = "windows")]
use tracing::debug;
#[cfg(not(target_os = "windows"))]
use tracing::warn;

use snaptext_core::config::RecognitionConfig;
use snaptext_core::error::SnaptextError;
use snaptext_core::types::RecognitionResult;

use crate::{PreparedImage, RecognitionEngine};

/// Recognition engine backed by `Windows.Media.Ocr`.
#[derive(Debug, Clone)]
pub struct WindowsRecognitionEngine {
    language: String,
}

impl WindowsRecognitionEngine {
    /// Create an engine for the language configured in `config`.
    pub fn new(config: &RecognitionConfig) -> Self {
        Self {
            language: config.language.clone(),
        }
    }

    /// BCP-47 language tag used for recognition.
    pub fn language(&self) -> &str {
        &self.language
    }
}

// =============================================================================
// Windows implementation
// =============================================================================

#[cfg(target_os = "windows")]
impl RecognitionEngine for WindowsRecognitionEngine {
    fn recognize(&self, image: &PreparedImage) -> Result<RecognitionResult, SnaptextError> {
        let bmp = image.to_bmp()?;
        let result = ocr_from_bmp_bytes(&bmp, &self.language)?;
        debug!(
            image_id = %image.source_id(),
            lines = result.len(),
            "OCR completed"
        );
        Ok(result)
    }
}

#[cfg(target_os = "windows")]
fn ocr_from_bmp_bytes(data: &[u8], language: &str) -> Result<RecognitionResult, SnaptextError> {
    use snaptext_core::types::{BoundingBox, TextObservation};
    use windows::core::HSTRING;
    use windows::Globalization::Language;
    use windows::Graphics::Imaging::*;
    use windows::Media::Ocr::OcrEngine;
    use windows::Storage::Streams::*;

    let engine_err = |step: &str, e: windows::core::Error| {
        SnaptextError::Engine(format!("{} failed: {}", step, e))
    };

    let stream = InMemoryRandomAccessStream::new().map_err(|e| engine_err("Stream creation", e))?;
    let writer =
        DataWriter::CreateDataWriter(&stream).map_err(|e| engine_err("CreateDataWriter", e))?;
    writer
        .WriteBytes(data)
        .map_err(|e| engine_err("WriteBytes", e))?;
    writer
        .StoreAsync()
        .map_err(|e| engine_err("StoreAsync", e))?
        .get()
        .map_err(|e| engine_err("StoreAsync get", e))?;
    writer
        .FlushAsync()
        .map_err(|e| engine_err("FlushAsync", e))?
        .get()
        .map_err(|e| engine_err("FlushAsync get", e))?;
    writer
        .DetachStream()
        .map_err(|e| engine_err("DetachStream", e))?;
    stream.Seek(0).map_err(|e| engine_err("Seek", e))?;

    let decoder = BitmapDecoder::CreateAsync(&stream)
        .map_err(|e| engine_err("BitmapDecoder::CreateAsync", e))?
        .get()
        .map_err(|e| engine_err("BitmapDecoder get", e))?;
    let bitmap = decoder
        .GetSoftwareBitmapAsync()
        .map_err(|e| engine_err("GetSoftwareBitmapAsync", e))?
        .get()
        .map_err(|e| engine_err("GetSoftwareBitmap get", e))?;

    // The OCR engine only takes Bgra8 or Gray8.
    let ocr_bitmap = SoftwareBitmap::Convert(&bitmap, BitmapPixelFormat::Bgra8)
        .map_err(|e| engine_err("SoftwareBitmap conversion", e))?;

    let lang = Language::CreateLanguage(&HSTRING::from(language))
        .map_err(|e| engine_err("Language creation", e))?;
    let engine =
        OcrEngine::TryCreateFromLanguage(&lang).map_err(|e| engine_err("OcrEngine creation", e))?;

    let result = engine
        .RecognizeAsync(&ocr_bitmap)
        .map_err(|e| engine_err("RecognizeAsync", e))?
        .get()
        .map_err(|e| engine_err("RecognizeAsync get", e))?;

    let lines = result.Lines().map_err(|e| engine_err("Lines", e))?;
    let mut observations = Vec::new();
    for line in &lines {
        let text = line.Text().map_err(|e| engine_err("Line text", e))?;

        // Line bounds are the union of its word rectangles.
        let mut bounds: Option<BoundingBox> = None;
        for word in &line.Words().map_err(|e| engine_err("Words", e))? {
            let rect = word
                .BoundingRect()
                .map_err(|e| engine_err("BoundingRect", e))?;
            bounds = Some(match bounds {
                None => BoundingBox {
                    x: rect.X,
                    y: rect.Y,
                    width: rect.Width,
                    height: rect.Height,
                },
                Some(b) => {
                    let x = b.x.min(rect.X);
                    let y = b.y.min(rect.Y);
                    BoundingBox {
                        x,
                        y,
                        width: (b.x + b.width).max(rect.X + rect.Width) - x,
                        height: (b.y + b.height).max(rect.Y + rect.Height) - y,
                    }
                }
            });
        }

        // Windows.Media.Ocr does not report confidences.
        let observation = TextObservation::new(text.to_string_lossy(), 1.0);
        observations.push(match bounds {
            Some(b) => observation.with_bounds(b),
            None => observation,
        });
    }

    Ok(RecognitionResult::new(observations))
}

// =============================================================================
// Non-Windows stub
// =============================================================================

#[cfg(not(target_os = "windows"))]
impl RecognitionEngine for WindowsRecognitionEngine {
    fn recognize(&self, _image: &PreparedImage) -> Result<RecognitionResult, SnaptextError> {
        warn!("WindowsRecognitionEngine called on non-Windows platform");
        Err(SnaptextError::Engine(
            "Windows OCR is only available on Windows".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_uses_configured_language() {
        let config = RecognitionConfig {
            language: "de-DE".to_string(),
            ..RecognitionConfig::default()
        };
        let engine = WindowsRecognitionEngine::new(&config);
        assert_eq!(engine.language(), "de-DE");
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_recognize_returns_error_on_non_windows() {
        use image::{DynamicImage, RgbImage};
        use snaptext_core::types::{Image, ImageOrigin};

        let img = Image::new(
            DynamicImage::ImageRgb8(RgbImage::new(8, 8)),
            ImageOrigin::Camera,
        );
        let prepared = crate::prepare(&img, &RecognitionConfig::default()).unwrap();
        let engine = WindowsRecognitionEngine::new(&RecognitionConfig::default());

        let err = engine.recognize(&prepared).unwrap_err();
        assert!(matches!(err, SnaptextError::Engine(_)));
        assert!(err.to_string().contains("only available on Windows"));
    }
}
