//! Terminal front-end for the sound garden

mod keymap;
mod ui;

use anyhow::{Context, Result};
use audio::{Mixer, PlaybackConfig};
use audio_io::{list_output_devices, OutputDevice, SymphoniaDecoder};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use garden::{
    display_name, AdjustSteps, ControllerConfig, FileStore, GardenController, GardenHandler,
    GardenSnapshot, KeyValueStore, StoreAssets,
};
use garden_core::{GardenCommand, GardenEvent, PlacementParams};
use keymap::Input;
use log::{debug, error, info, warn};
use ratatui::{backend::CrosstermBackend, Terminal};
use settings_manager::{ConfigManager, Settings};
use std::{
    fs::File,
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::sync::{mpsc, watch};

/// soundgarden - place looping sounds on a grid and walk among them
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    /// Settings file (defaults to the platform config directory)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Grid columns, overriding the settings file
    #[clap(long)]
    cols: Option<u32>,

    /// Grid rows, overriding the settings file
    #[clap(long)]
    rows: Option<u32>,

    /// Directory for saved state, relative locators and the log
    #[clap(long)]
    data_dir: Option<PathBuf>,

    /// Log file (defaults to soundgarden.log in the data directory)
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// Audio files to add to the library on startup
    #[clap(short, long = "import", value_name = "FILE")]
    import: Vec<PathBuf>,

    /// Print the available output devices and exit
    #[clap(long)]
    list_devices: bool,
}

/// App state
struct App {
    /// Whether the app should exit
    should_quit: bool,
    /// Latest view of the garden
    snapshots: watch::Receiver<GardenSnapshot>,
}

impl App {
    fn new(snapshots: watch::Receiver<GardenSnapshot>) -> Self {
        Self {
            should_quit: false,
            snapshots,
        }
    }

    /// Handle a terminal event, returning the command it maps to
    fn handle_event(&mut self, event: Event) -> Option<GardenCommand> {
        let Event::Key(key) = event else {
            return None;
        };
        match keymap::translate(&key)? {
            Input::Quit => {
                self.should_quit = true;
                None
            }
            Input::Garden(input) => Some(GardenCommand::Key(input)),
        }
    }
}

/// Settings with command-line overrides applied.
fn effective_settings(args: &Args, config: &ConfigManager) -> Result<Settings> {
    let mut settings = config.settings().clone();
    if let Some(cols) = args.cols {
        settings.grid.cols = cols;
    }
    if let Some(rows) = args.rows {
        settings.grid.rows = rows;
    }
    if let Some(dir) = &args.data_dir {
        settings.library.data_dir = Some(dir.clone());
    }
    settings.validate()?;
    Ok(settings)
}

fn controller_config(settings: &Settings) -> Result<ControllerConfig> {
    let grid = settings.grid()?;
    Ok(ControllerConfig {
        grid,
        defaults: PlacementParams {
            volume: settings.playback.default_volume,
            radius: settings.playback.default_radius,
            timing_offset_seconds: 0.0,
        },
        playback: PlaybackConfig {
            grid_width: grid.cols(),
            ramp: settings.playback.ramp(),
            release: settings.playback.release(),
        },
        bindings: settings.keys.clone(),
        steps: AdjustSteps {
            volume: settings.playback.volume_step,
            radius: settings.playback.radius_step,
            timing: settings.playback.timing_step,
        },
    })
}

fn init_logging(debug: bool, log_file: &Path) -> Result<()> {
    let file = File::create(log_file)
        .with_context(|| format!("Failed to create log file {:?}", log_file))?;
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Opens the configured output device, falling back to a mixer nobody
/// hears so the garden stays usable without audio hardware.
fn open_output(preferred: &str) -> (Option<OutputDevice>, Mixer) {
    match OutputDevice::open(Some(preferred)) {
        Ok((device, mixer)) => (Some(device), mixer),
        Err(e) => {
            warn!("Audio output unavailable, continuing silently: {}", e);
            (None, Mixer::new(48_000))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        for name in list_output_devices() {
            println!("{}", name);
        }
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => ConfigManager::with_file(path)?,
        None => ConfigManager::new()?,
    };
    if !config.config_file().exists() {
        if let Err(e) = config.save() {
            eprintln!("Could not write default settings: {}", e);
        }
    }
    let settings = effective_settings(&args, &config)?;

    let data_dir = settings.data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;
    let log_file = args
        .log_file
        .clone()
        .unwrap_or_else(|| data_dir.join("soundgarden.log"));
    init_logging(args.debug, &log_file)?;
    debug!("Debug logging enabled");

    info!("Starting soundgarden with data in {:?}", data_dir);

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(data_dir.join("state")));
    let assets = Arc::new(StoreAssets::new(&data_dir, Arc::clone(&store)));
    let (device, mixer) = open_output(&settings.audio.output_device);

    let mut controller = GardenController::new(controller_config(&settings)?, mixer, store);
    controller.restore();
    if let Some(manifest) = &settings.library.manifest {
        controller.load_manifest(manifest.clone());
    }

    let (command_tx, command_rx) = mpsc::channel(64);
    let (event_tx, mut event_rx) = mpsc::channel(256);
    let mut handler = GardenHandler::new(
        controller,
        assets,
        Arc::new(SymphoniaDecoder),
        command_rx,
        event_tx,
    );
    let mut app = App::new(handler.subscribe());
    let handler_task = tokio::spawn(async move {
        if let Err(e) = handler.run().await {
            error!("Garden handler failed: {}", e);
        }
    });

    for path in &args.import {
        match tokio::fs::read(path).await {
            Ok(payload) => {
                let name = display_name(&path.to_string_lossy());
                command_tx
                    .send(GardenCommand::Upload { name, payload })
                    .await?;
            }
            Err(e) => warn!("Skipping import {:?}: {}", path, e),
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &command_tx, &mut event_rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if command_tx.send(GardenCommand::Shutdown).await.is_err() {
        debug!("Handler already stopped");
    }
    handler_task.await?;
    // Let released voices fade before the stream goes away
    if device.is_some() {
        tokio::time::sleep(settings.playback.release()).await;
    }
    drop(device);

    info!("Exiting soundgarden");
    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    command_tx: &mpsc::Sender<GardenCommand>,
    event_rx: &mut mpsc::Receiver<GardenEvent>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(50);

    loop {
        // Render the UI
        let snapshot = app.snapshots.borrow_and_update().clone();
        terminal.draw(|f| ui::draw(f, &snapshot))?;

        // Poll for events
        if event::poll(tick_rate)? {
            if let Some(command) = app.handle_event(event::read()?) {
                command_tx
                    .send(command)
                    .await
                    .context("Garden handler stopped")?;
            }
        }

        while let Ok(event) = event_rx.try_recv() {
            debug!("Garden event: {:?}", event);
        }

        // Check if we should quit
        if app.should_quit {
            break;
        }
    }

    Ok(())
}
