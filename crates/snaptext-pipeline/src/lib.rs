//! SnapText Pipeline crate - capture-and-recognize orchestration.
//!
//! Provides the RecognitionPipeline, the presentation thread that owns the
//! PresentationState, and the read-only StateView handed to the display
//! layer. Data flows one way: image source -> pipeline -> presentation
//! state -> display.

pub mod pipeline;
pub mod presenter;
pub mod state;

pub use pipeline::{Invocation, RecognitionPipeline};
pub use presenter::{Delivery, Disposition, Presenter, PresenterHandle, PresenterThread};
pub use state::{PresentationState, StateView};
