//! SnapText OCR crate - recognition engine trait and implementations.
//!
//! Provides the RecognitionEngine trait, image preparation into the engine's
//! grayscale representation, a MockRecognitionEngine for testing, and a
//! WindowsRecognitionEngine that uses the `Windows.Media.Ocr` WinRT API.

pub mod prepare;
pub mod windows_ocr;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use snaptext_core::error::SnaptextError;
use snaptext_core::types::RecognitionResult;

pub use prepare::{prepare, PreparedImage};
pub use windows_ocr::WindowsRecognitionEngine;

/// Text recognition capability.
///
/// Implementations are blocking and may be slow; callers must run them off
/// the presentation thread (the pipeline uses the tokio blocking pool).
pub trait RecognitionEngine: Send + Sync {
    /// Detect text regions and return them in the engine's reading order.
    fn recognize(&self, image: &PreparedImage) -> Result<RecognitionResult, SnaptextError>;
}

/// One scripted answer of the mock engine.
#[derive(Debug, Clone)]
pub struct MockResponse {
    result: Result<Vec<String>, String>,
    delay: Duration,
}

impl MockResponse {
    /// Recognize the given lines, one observation each.
    pub fn lines(lines: &[&str]) -> Self {
        Self {
            result: Ok(lines.iter().map(|l| l.to_string()).collect()),
            delay: Duration::ZERO,
        }
    }

    /// Fail with an engine error carrying `message`.
    pub fn error(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            delay: Duration::ZERO,
        }
    }

    /// Block the worker for `delay` before answering.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Mock recognition engine for testing.
///
/// Answers from a queue of scripted responses first, then falls back to a
/// fixed default response. Counts every call.
#[derive(Debug)]
pub struct MockRecognitionEngine {
    default: MockResponse,
    script: Mutex<VecDeque<MockResponse>>,
    calls: AtomicUsize,
}

impl MockRecognitionEngine {
    /// An engine that always recognizes a fixed sample line.
    pub fn new() -> Self {
        Self::from_response(MockResponse::lines(&["Mock recognized text"]))
    }

    /// An engine that always recognizes the given lines.
    pub fn with_lines(lines: &[&str]) -> Self {
        Self::from_response(MockResponse::lines(lines))
    }

    /// An engine that never finds any text.
    pub fn empty() -> Self {
        Self::from_response(MockResponse::lines(&[]))
    }

    /// An engine that always fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self::from_response(MockResponse::error(message))
    }

    /// An engine with a custom default response.
    pub fn from_response(default: MockResponse) -> Self {
        Self {
            default,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue responses to be used, in order, before the default one.
    pub fn with_script(self, responses: Vec<MockResponse>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.extend(responses);
        }
        self
    }

    /// Number of times `recognize` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> Result<MockResponse, SnaptextError> {
        let mut script = self
            .script
            .lock()
            .map_err(|e| SnaptextError::Engine(format!("Mock script mutex poisoned: {}", e)))?;
        Ok(script.pop_front().unwrap_or_else(|| self.default.clone()))
    }
}

impl Default for MockRecognitionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecognitionEngine for MockRecognitionEngine {
    fn recognize(&self, _image: &PreparedImage) -> Result<RecognitionResult, SnaptextError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self.next_response()?;
        if !response.delay.is_zero() {
            std::thread::sleep(response.delay);
        }
        match response.result {
            Ok(lines) => Ok(RecognitionResult::from_lines(&lines)),
            Err(msg) => Err(SnaptextError::Engine(msg)),
        }
    }
}
