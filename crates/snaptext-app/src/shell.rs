//! Interactive shell: the host UI that drives the image source and the pipeline.
//!
//! Input is read line by line on the blocking pool so the async runtime
//! stays free for recognitions. `convert` returns immediately; the display
//! task prints the outcome once the presentation thread applies it.

use std::io::Write;
use std::str::FromStr;

use tracing::{debug, info, warn};

use snaptext_capture::{ImageSource, Selection};
use snaptext_core::error::SnaptextError;
use snaptext_ocr::RecognitionEngine;
use snaptext_pipeline::{Disposition, PresenterHandle, RecognitionPipeline};

use crate::display::render;

const PROMPT: &str = "snaptext> ";

const HELP: &str = "\
Commands:
  gallery   select an image file
  camera    use a captured photo
  convert   extract text from the current image
  show      print the current image and text
  help      show this message
  quit      exit";

/// A user trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Gallery,
    Camera,
    Convert,
    Show,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gallery" | "select" | "g" => Ok(Command::Gallery),
            "camera" | "capture" | "photo" => Ok(Command::Camera),
            "convert" | "c" => Ok(Command::Convert),
            "show" | "s" => Ok(Command::Show),
            "help" | "h" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(format!("Unknown command `{}`. Type `help`.", other)),
        }
    }
}

/// Print `prompt` and read one trimmed line from stdin. `None` on end of input.
pub fn prompt_line(prompt: &str) -> std::io::Result<Option<String>> {
    let mut stdout = std::io::stdout();
    stdout.write_all(prompt.as_bytes())?;
    stdout.flush()?;

    let mut line = String::new();
    if std::io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

async fn next_line() -> Result<Option<String>, SnaptextError> {
    tokio::task::spawn_blocking(|| prompt_line(PROMPT))
        .await
        .map_err(|e| SnaptextError::Presentation(format!("Input task panicked: {}", e)))?
        .map_err(SnaptextError::from)
}

/// The shell's collaborators.
pub struct Shell<'a, S, E> {
    pub source: &'a S,
    pub pipeline: &'a RecognitionPipeline<E>,
    pub presenter: &'a PresenterHandle,
}

impl<S, E> Shell<'_, S, E>
where
    S: ImageSource,
    E: RecognitionEngine + 'static,
{
    /// Read and execute commands until `quit` or end of input.
    pub async fn run(&self) -> Result<(), SnaptextError> {
        println!("{}", HELP);
        while let Some(line) = next_line().await? {
            if line.is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(Command::Quit) => break,
                Ok(command) => self.execute(command).await?,
                Err(msg) => println!("{}", msg),
            }
        }
        info!("Shell finished");
        Ok(())
    }

    async fn execute(&self, command: Command) -> Result<(), SnaptextError> {
        debug!(?command, "Executing command");
        match command {
            Command::Gallery => {
                let selection = self.source.select_from_gallery().await;
                self.accept(selection).await
            }
            Command::Camera => {
                let selection = self.source.capture_from_camera().await;
                self.accept(selection).await
            }
            Command::Convert => self.convert(),
            Command::Show => {
                println!("{}", render(&self.presenter.current()));
                Ok(())
            }
            Command::Help => {
                println!("{}", HELP);
                Ok(())
            }
            Command::Quit => Ok(()),
        }
    }

    /// Forward a picked image to the presentation thread.
    async fn accept(
        &self,
        selection: Result<Selection, SnaptextError>,
    ) -> Result<(), SnaptextError> {
        match selection {
            Ok(Selection::Image(image)) => {
                self.presenter.select_image(image).await?;
            }
            Ok(Selection::Cancelled) => debug!("Selection cancelled"),
            Err(e) => {
                warn!(error = %e, "Failed to load the image");
                println!("{}", e);
            }
        }
        Ok(())
    }

    fn convert(&self) -> Result<(), SnaptextError> {
        let current = self.presenter.current().current_image().cloned();
        let Some(invocation) = self.pipeline.run(current)? else {
            println!("Select an image first.");
            return Ok(());
        };

        println!("Recognizing...");
        tokio::spawn(async move {
            let id = invocation.id();
            match invocation.delivered().await {
                Ok(delivery) => {
                    if let Disposition::Discarded(reason) = delivery.disposition {
                        info!(invocation = %id, ?reason, "Result not shown");
                    }
                }
                Err(e) => warn!(invocation = %id, error = %e, "No outcome delivered"),
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snaptext_capture::MockImageSource;
    use snaptext_core::config::{PipelineConfig, RecognitionConfig};
    use snaptext_ocr::MockRecognitionEngine;
    use snaptext_pipeline::Presenter;

    #[test]
    fn test_parse_commands() {
        assert_eq!("gallery".parse::<Command>(), Ok(Command::Gallery));
        assert_eq!("  Camera ".parse::<Command>(), Ok(Command::Camera));
        assert_eq!("c".parse::<Command>(), Ok(Command::Convert));
        assert_eq!("show".parse::<Command>(), Ok(Command::Show));
        assert_eq!("?".parse::<Command>(), Ok(Command::Help));
        assert_eq!("exit".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_unknown_command() {
        let err = "scan".parse::<Command>().unwrap_err();
        assert!(err.contains("scan"));
    }

    #[tokio::test]
    async fn test_gallery_then_convert() {
        let (handle, thread) = Presenter::spawn(PipelineConfig::default()).unwrap();
        let pipeline = RecognitionPipeline::new(
            MockRecognitionEngine::with_lines(&["Receipt", "Total 9.99"]),
            handle.clone(),
            RecognitionConfig::default(),
        )
        .unwrap();
        let source = MockImageSource::new();
        let shell = Shell {
            source: &source,
            pipeline: &pipeline,
            presenter: &handle,
        };

        let mut view = handle.view();
        shell.execute(Command::Gallery).await.unwrap();
        assert!(handle.current().current_image().is_some());

        shell.execute(Command::Convert).await.unwrap();
        let state = loop {
            let state = view.changed().await.unwrap();
            if state.current_outcome().is_some() {
                break state;
            }
        };
        assert_eq!(
            state.current_outcome().and_then(|o| o.text()),
            Some("Receipt\nTotal 9.99")
        );

        handle.shutdown();
        thread.join().unwrap();
    }

    #[tokio::test]
    async fn test_convert_without_image_is_noop() {
        let (handle, thread) = Presenter::spawn(PipelineConfig::default()).unwrap();
        let pipeline = RecognitionPipeline::new(
            MockRecognitionEngine::new(),
            handle.clone(),
            RecognitionConfig::default(),
        )
        .unwrap();
        let source = MockImageSource::cancelling();
        let shell = Shell {
            source: &source,
            pipeline: &pipeline,
            presenter: &handle,
        };

        shell.execute(Command::Camera).await.unwrap();
        shell.execute(Command::Convert).await.unwrap();
        assert_eq!(pipeline.engine().calls(), 0);
        assert_eq!(handle.current().revision(), 0);

        handle.shutdown();
        thread.join().unwrap();
    }

    #[tokio::test]
    async fn test_load_failure_is_reported_not_fatal() {
        let (handle, thread) = Presenter::spawn(PipelineConfig::default()).unwrap();
        let pipeline = RecognitionPipeline::new(
            MockRecognitionEngine::new(),
            handle.clone(),
            RecognitionConfig::default(),
        )
        .unwrap();
        let source = MockImageSource::failing("not an image");
        let shell = Shell {
            source: &source,
            pipeline: &pipeline,
            presenter: &handle,
        };

        assert!(shell.execute(Command::Gallery).await.is_ok());
        assert!(handle.current().current_image().is_none());

        handle.shutdown();
        thread.join().unwrap();
    }
}
