//! Text rendering of the presentation state.
//!
//! The display only ever reads `PresentationState` copies from a
//! `StateView`; it has no way to write back.

use snaptext_core::types::PipelineOutcome;
use snaptext_pipeline::{PresentationState, StateView};

/// Render the state as the text block shown to the user.
pub fn render(state: &PresentationState) -> String {
    let mut out = String::new();

    match state.current_image() {
        Some(image) => out.push_str(&format!(
            "Image: {}x{} from {}\n",
            image.width(),
            image.height(),
            image.origin()
        )),
        None => out.push_str("No image selected. Use `gallery` or `camera`.\n"),
    }

    match state.current_outcome() {
        Some(PipelineOutcome::Success { text }) if text.is_empty() => {
            out.push_str("(no text found)\n")
        }
        Some(PipelineOutcome::Success { text }) => {
            out.push_str("----\n");
            out.push_str(text);
            out.push('\n');
        }
        Some(PipelineOutcome::Failure(reason)) => {
            out.push_str(&format!("Error: {}\n", reason));
        }
        None if state.current_image().is_some() => {
            out.push_str("Type `convert` to extract the text.\n")
        }
        None => {}
    }

    out
}

/// Print the state every time the presentation thread publishes a change.
///
/// Returns when the presentation thread stops.
pub async fn run_display(mut view: StateView) {
    while let Ok(state) = view.changed().await {
        println!("\n{}", render(&state));
    }
    tracing::debug!("Display loop finished");
}
