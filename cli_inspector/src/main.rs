use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::prelude::*;

mod app;
mod ui;

use app::InspectorApp;
use core_vitrine::{log_channel, spawn_engine_worker, ContentLibrary, EngineConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Vitrine showcase grid inspector", long_about = None)]
struct Cli {
    /// Seed for all engine randomness; defaults to the builtin seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Engine tick width in milliseconds.
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,
    /// Start with the narrow (non-morphing) layout.
    #[arg(long)]
    narrow: bool,
    /// Start with the reduced-motion preference set.
    #[arg(long)]
    reduced_motion: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Engine logs flow through the forward layer into the UI's log pane;
    // nothing writes to stdout while the terminal is in raw mode.
    let (log_layer, log_rx) = log_channel();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(log_layer)
        .init();

    let mut config = EngineConfig::builtin();
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    config.tick_ms = cli.tick_ms.max(1);
    config.wide_viewport = !cli.narrow;
    config.reduced_motion = cli.reduced_motion;

    let library = ContentLibrary::builtin();
    let (worker, frames, commands) = spawn_engine_worker(config.clone(), library);

    let app = InspectorApp::new(&config, frames, commands, log_rx)?;
    let result = app.run();
    worker.stop();
    result
}
