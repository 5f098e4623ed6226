//! File-backed image source.
//!
//! The host supplies a `PathPicker` (its file dialog, a prompt, a camera
//! tool that writes a snapshot) and this source turns the chosen path into a
//! decoded `Image`. Picking and decoding both run on the blocking pool since
//! the picker waits on the user.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use snaptext_core::error::SnaptextError;
use snaptext_core::types::{Image, ImageOrigin};

use crate::{ImageSource, Selection};

/// Asks the user for a file for the given origin. `None` means cancelled.
pub type PathPicker = Arc<dyn Fn(ImageOrigin) -> Option<PathBuf> + Send + Sync>;

/// Image source that loads user-chosen files from disk.
#[derive(Clone)]
pub struct FileImageSource {
    picker: PathPicker,
}

impl FileImageSource {
    /// Create a source around the host's picker.
    pub fn new<F>(picker: F) -> Self
    where
        F: Fn(ImageOrigin) -> Option<PathBuf> + Send + Sync + 'static,
    {
        Self {
            picker: Arc::new(picker),
        }
    }

    async fn acquire(&self, origin: ImageOrigin) -> Result<Selection, SnaptextError> {
        let picker = Arc::clone(&self.picker);
        tokio::task::spawn_blocking(move || match picker(origin) {
            Some(path) => load_selection(&path, origin),
            None => {
                debug!(%origin, "Image picker cancelled");
                Ok(Selection::Cancelled)
            }
        })
        .await
        .map_err(|e| SnaptextError::ImageLoad(format!("Picker task panicked: {}", e)))?
    }
}

impl std::fmt::Debug for FileImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileImageSource").finish_non_exhaustive()
    }
}

impl ImageSource for FileImageSource {
    async fn select_from_gallery(&self) -> Result<Selection, SnaptextError> {
        self.acquire(ImageOrigin::Gallery).await
    }

    async fn capture_from_camera(&self) -> Result<Selection, SnaptextError> {
        self.acquire(ImageOrigin::Camera).await
    }
}

/// Read and decode the file at `path`.
///
/// A permission failure counts as a cancelled pick rather than an error.
fn load_selection(path: &Path, origin: ImageOrigin) -> Result<Selection, SnaptextError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            warn!(path = %path.display(), "Permission denied reading image, treating as cancelled");
            return Ok(Selection::Cancelled);
        }
        Err(e) => {
            return Err(SnaptextError::ImageLoad(format!(
                "{}: {}",
                path.display(),
                e
            )))
        }
    };

    let image = Image::from_encoded(&bytes, origin).map_err(|e| {
        SnaptextError::ImageLoad(format!("{}: {}", path.display(), e))
    })?;

    info!(
        path = %path.display(),
        %origin,
        image_id = %image.id(),
        width = image.width(),
        height = image.height(),
        "Image loaded"
    );
    Ok(Selection::Image(image))
}
