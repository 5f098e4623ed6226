use thiserror::Error;

/// Top-level error type for the SnapText workspace.
///
/// Cancelling a picker is not represented here: image sources report it as
/// a normal `Selection::Cancelled` value. Everything below is a real failure,
/// though none of them is fatal to the process.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnaptextError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The source could not turn the selected file into a bitmap.
    #[error("Failed to load the image: {0}")]
    ImageLoad(String),

    /// The bitmap could not be converted to the engine's representation.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Recognition engine error: {0}")]
    Engine(String),

    /// The presentation thread is gone or refused a message.
    #[error("Presentation error: {0}")]
    Presentation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for SnaptextError {
    fn from(err: toml::de::Error) -> Self {
        SnaptextError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SnaptextError {
    fn from(err: toml::ser::Error) -> Self {
        SnaptextError::Config(err.to_string())
    }
}

impl From<image::ImageError> for SnaptextError {
    fn from(err: image::ImageError) -> Self {
        SnaptextError::ImageLoad(err.to_string())
    }
}

/// A specialized `Result` type for SnapText operations.
pub type Result<T> = std::result::Result<T, SnaptextError>;
