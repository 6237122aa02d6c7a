use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ratatui::crossterm::ExecutableCommand;
use ratatui::crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod domain;
mod editor;
mod export;
mod layout;
mod model;
mod table;
mod ui;

use controller::Controller;
use domain::{CedConfig, CedError};
use model::{Model, Status};
use ui::EditorUI;

#[derive(Parser, Debug)]
#[command(version, about = "A tui based csv preview and editor.")]
struct Cli {
    /// csv file to preview and edit
    path: String,

    /// event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// write tracing output to this file
    #[arg(long)]
    log: Option<PathBuf>,

    /// disable mouse capture, keyboard gestures only
    #[arg(long)]
    no_mouse: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(path) = &cli.log
        && let Err(e) = init_tracing(path)
    {
        eprintln!("Failed to set up logging: {e:?}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn run(cli: &Cli) -> Result<(), CedError> {
    let path = shellexpand::full(&cli.path)
        .map_err(|e| CedError::LoadingFailed(e.to_string()))?
        .into_owned();
    info!("Starting ced with {path}");

    let cfg = CedConfig::default()
        .event_poll_time(cli.poll_ms)
        .mouse_capture(!cli.no_mouse);

    let mut terminal = ratatui::init();
    let size = terminal.size()?;
    let mut model = Model::init(size.width, size.height);
    model.load_data_file(Path::new(&path))?;

    if cfg.mouse_capture {
        std::io::stdout().execute(EnableMouseCapture)?;
    }

    let ui = EditorUI::new();
    let controller = Controller::new(&cfg);
    let result = event_loop(&mut model, &ui, &controller, &mut terminal);

    if cfg.mouse_capture {
        let _ = std::io::stdout().execute(DisableMouseCapture);
    }
    result
}

fn event_loop(
    model: &mut Model,
    ui: &EditorUI,
    controller: &Controller,
    terminal: &mut ratatui::DefaultTerminal,
) -> Result<(), CedError> {
    while model.status != Status::Quitting {
        // Render the current view
        terminal.draw(|f| ui.draw(model.get_uidata(), f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(model)? {
            model.update(message)?;
        }
    }
    Ok(())
}

fn init_tracing(path: &Path) -> Result<(), CedError> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}
