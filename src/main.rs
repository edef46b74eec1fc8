//! Barbot controller: entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                      │
//! │  PinBank<SimulatedPin>  StatusStrip  JsonFileStore           │
//! │  (ActuatorPort)         (Indicator)  (PumpStore)             │
//! │  ConsoleFrontend        SpoolSource  LogEventSink            │
//! │  (MenuDisplay+Events)   (Commands)   (EventSink)             │
//! │                                                              │
//! │  ─────────────────── Port Trait Boundary ─────────────────   │
//! │                                                              │
//! │   Controller ─▶ Menu ─▶ Session ─▶ DispenseEngine            │
//! │   RemoteLoop ────────────▲            │ EmergencyStop        │
//! │                                       └ IndicatorLoop        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Startup order: config → pump table → catalog → relay lines (forced
//! off) → emergency stop → signal handler → session loop.  Any failure
//! before the loop starts is fatal.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};

use barbot::adapters::console::ConsoleFrontend;
use barbot::adapters::gpio::PinBank;
use barbot::adapters::json_store::JsonFileStore;
use barbot::adapters::log_sink::LogEventSink;
use barbot::adapters::sim_pin::SimulatedPin;
use barbot::adapters::spool::SpoolSource;
use barbot::app::ports::ActuatorPort;
use barbot::app::remote::RemoteLoop;
use barbot::app::session::{Controller, Session, SessionSettings};
use barbot::config::DispenserConfig;
use barbot::dispense::{DispenseEngine, EngineSettings};
use barbot::drivers::pump::Polarity;
use barbot::drivers::status_led::{LogFrameWriter, StatusStrip};
use barbot::indicator::IndicatorLoop;
use barbot::menu::LeafPolicy;
use barbot::recipes::RecipeCatalog;
use barbot::registry::PumpRegistry;
use barbot::safety::EmergencyStop;
use barbot::signals;

const STRIP_PIXELS: usize = 60;
/// Conventional exit status for termination by SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

/// Multi-pump drink dispenser controller.
#[derive(Parser, Debug)]
#[command(name = "barbot", about = "Multi-pump drink dispenser controller", version)]
struct Cli {
    /// JSON controller configuration; built-in defaults when omitted.
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Mode {
    /// Interactive menu on stdin/stdout (default)
    #[default]
    Menu,
    /// Pour drink orders from the spool inbox
    Remote,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => DispenserConfig::load(path)
            .with_context(|| format!("loading controller config {}", path.display()))?,
        None => DispenserConfig::default(),
    };

    let store = JsonFileStore::new(&config.pump_config_path);
    let registry = PumpRegistry::load(&store).with_context(|| {
        format!("loading pump configuration {}", config.pump_config_path.display())
    })?;

    let catalog = match &config.recipes_path {
        Some(path) => RecipeCatalog::load(path)
            .with_context(|| format!("loading recipe catalog {}", path.display()))?,
        None => RecipeCatalog::default(),
    };
    info!(
        "{} recipe(s), {} pump slot(s)",
        catalog.recipes().len(),
        registry.slots().len()
    );

    // ── Relay lines: all forced off here ──────────────────────
    let polarity = if config.active_low {
        Polarity::ActiveLow
    } else {
        Polarity::ActiveHigh
    };
    let bank = PinBank::new(
        registry.lines().into_iter().map(|line| (line, SimulatedPin::new(line))),
        polarity,
    )
    .unwrap_or_else(|never| match never {});
    let actuators: Arc<dyn ActuatorPort> = Arc::new(bank);
    let stop = EmergencyStop::new(actuators, registry.lines());

    signals::spawn_signal_handler(stop.clone(), || std::process::exit(EXIT_INTERRUPTED))
        .context("installing signal handler")?;

    let strip = Arc::new(StatusStrip::new(STRIP_PIXELS, LogFrameWriter));
    let lights = IndicatorLoop::new(strip, config.indicator_cadence(), config.success_cue());
    let engine = DispenseEngine::new(
        stop.clone(),
        lights,
        EngineSettings {
            flow_rate_secs_per_unit: config.flow_rate_secs_per_unit,
            progress_interval: config.progress_interval(),
        },
    );
    let session = Session::new(
        registry,
        Box::new(store),
        catalog,
        engine,
        SessionSettings::from(&config),
    );

    match cli.mode.unwrap_or_default() {
        Mode::Menu => {
            let mut controller = Controller::new(
                session,
                ConsoleFrontend::new(io::stdout()),
                LeafPolicy::default(),
            );
            controller.run(io::stdin().lock());
        }
        Mode::Remote => {
            let source = SpoolSource::new(&config.remote).context("opening command spool")?;
            RemoteLoop::new(source, &config.remote).run(&session, &mut LogEventSink::new());
        }
    }

    stop.engage();
    info!("Shut down cleanly");
    Ok(())
}
