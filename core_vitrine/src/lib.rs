//! Core engine crate for the Vitrine cinematic showcase.
//!
//! Provides deterministic ECS systems that resolve one engine tick of the
//! review/photo grid when [`run_frame`] is invoked: selection, per-cell
//! scheduling, coordinator rotation and frame capture. Rendering is the
//! host's job; the engine only emits [`vitrine_schema::GridFrame`]s.

mod bridge;
mod commands;
mod components;
pub mod content;
mod log_stream;
pub mod metrics;
mod resources;
mod selection;
mod snapshot;
mod systems;
pub mod timing;

use bevy::prelude::*;
use std::sync::Arc;

pub use bridge::{
    command_channel, frame_channel, spawn_engine_worker, CommandBridge, EngineWorker, FrameBus,
};
pub use commands::queue_command;
pub use components::{CellKind, CellLayers, CellPhase, GridCell};
pub use content::{ContentError, ContentLibrary, BUILTIN_CONTENT_LIBRARY};
pub use log_stream::{log_channel, LogEnvelope, LogForwardLayer};
pub use metrics::EngineMetrics;
pub use resources::{
    ContentHandle, EngineConfig, EngineTick, GridLayout, PendingCommands, PhotoSeed, PreloadQueue,
    ViewerContext,
};
pub use selection::{BagFamily, SelectionEngine};
pub use snapshot::FrameHistory;

/// Construct a headless Bevy [`App`] running the showcase pipeline against
/// the builtin content catalog and default configuration.
pub fn build_headless_app() -> App {
    build_app_with(EngineConfig::builtin(), ContentLibrary::builtin())
}

/// Construct a headless app from an explicit configuration and catalog.
pub fn build_app_with(config: EngineConfig, library: Arc<ContentLibrary>) -> App {
    let mut app = App::new();

    let selection = SelectionEngine::new(Arc::clone(&library), config.seed);
    let layout = GridLayout::from_config(&config);
    let history = FrameHistory::with_capacity(config.frame_history_limit.max(1));
    let viewer = ViewerContext::from_config(&config);

    app.insert_resource(viewer)
        .insert_resource(EngineTick::default())
        .insert_resource(ContentHandle(library))
        .insert_resource(selection)
        .insert_resource(layout)
        .insert_resource(history)
        .insert_resource(EngineMetrics::default())
        .insert_resource(PendingCommands::default())
        .insert_resource(PreloadQueue::default())
        .insert_resource(config)
        .add_plugins(MinimalPlugins)
        .add_systems(Startup, systems::spawn_initial_grid)
        .add_systems(
            Update,
            (
                commands::apply_host_commands,
                systems::commit_staged_flips,
                systems::assign_desired_kinds,
                systems::reconcile_motion_edges,
                systems::advance_holds,
                systems::run_transitions,
                systems::rotate_photo_rows,
                systems::advance_tick,
                metrics::collect_metrics,
                snapshot::capture_frame,
            )
                .chain(),
        );

    app
}

/// Advance the engine by exactly one tick of `EngineConfig::tick_ms`
/// simulated milliseconds.
///
/// Each call processes the chained systems configured in [`build_app_with`]
/// (commands → flip commits → coordinator → holds → transitions → rotation
/// → tick increment → metrics → frame capture). Hosts own the real-time
/// cadence; tests call this in a loop.
pub fn run_frame(app: &mut App) {
    app.update();
}
