//! SnapText application binary - composition root.
//!
//! Ties together the SnapText crates into a single executable:
//! 1. Parse CLI args and load configuration from TOML
//! 2. Spawn the presentation thread that owns the displayed state
//! 3. Build the recognition pipeline around the platform OCR engine
//! 4. Run the display task, the event log and the interactive shell until `quit`

mod cli;
mod display;
mod event_log;
mod shell;

use clap::Parser;

use snaptext_capture::FileImageSource;
use snaptext_core::config::SnaptextConfig;
use snaptext_core::types::ImageOrigin;
use snaptext_ocr::windows_ocr::WindowsRecognitionEngine;
use snaptext_pipeline::{Presenter, RecognitionPipeline};

use cli::CliArgs;
use shell::{prompt_line, Shell};

fn pick_path(origin: ImageOrigin) -> Option<std::path::PathBuf> {
    let prompt = match origin {
        ImageOrigin::Gallery => "image path (blank to cancel)> ",
        ImageOrigin::Camera => "captured photo path (blank to cancel)> ",
    };
    match prompt_line(prompt) {
        Ok(Some(line)) if !line.is_empty() => Some(line.into()),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read the path");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing so its log level can seed the filter.
    let config_file = args.resolve_config_path();
    let loaded = if config_file.exists() {
        SnaptextConfig::load(&config_file).map(Some)
    } else {
        Ok(None)
    };
    let config_level = match &loaded {
        Ok(Some(config)) => config.general.log_level.clone(),
        _ => SnaptextConfig::default().general.log_level,
    };

    // Tracing goes to stderr so it never interleaves with shell output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(args.resolve_log_level(&config_level))
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting SnapText v{}", env!("CARGO_PKG_VERSION"));

    let config = match loaded {
        Ok(Some(config)) => config,
        Ok(None) => {
            tracing::info!(path = %config_file.display(), "No config file, using defaults");
            SnaptextConfig::default()
        }
        Err(e) => {
            tracing::warn!(path = %config_file.display(), error = %e, "Failed to load config, using defaults");
            SnaptextConfig::default()
        }
    };

    // Presentation thread.
    let (presenter, presenter_thread) = Presenter::spawn(config.pipeline.clone())?;
    tracing::info!(
        policy = ?config.pipeline.supersede_policy,
        discard_stale_images = config.pipeline.discard_stale_images,
        "Presentation thread started"
    );

    // Pipeline.
    let engine = WindowsRecognitionEngine::new(&config.recognition);
    tracing::info!(language = %engine.language(), "Recognition engine ready");
    let pipeline =
        RecognitionPipeline::new(engine, presenter.clone(), config.recognition.clone())?;

    let source = FileImageSource::new(pick_path);
    let display = tokio::spawn(display::run_display(presenter.view()));
    let event_log = tokio::spawn(event_log::run_event_log(presenter.subscribe_events()));

    let shell = Shell {
        source: &source,
        pipeline: &pipeline,
        presenter: &presenter,
    };
    let result = shell.run().await;

    // Shutdown. The event channel closes once every presenter handle is gone.
    presenter.shutdown();
    tokio::task::spawn_blocking(move || presenter_thread.join()).await??;
    drop(pipeline);
    drop(presenter);
    if let Err(e) = display.await {
        tracing::warn!(error = %e, "Display task failed");
    }
    if let Err(e) = event_log.await {
        tracing::warn!(error = %e, "Event log task failed");
    }
    tracing::info!("SnapText stopped");

    result.map_err(Into::into)
}
