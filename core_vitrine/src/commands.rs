use bevy::prelude::*;
use log::debug;

use crate::{
    bridge::CommandBridge,
    components::GridCell,
    resources::{PendingCommands, ViewerContext},
    selection::SelectionEngine,
};
use vitrine_runtime::{decode_command, CommandEnvelope, CommandPayload};

/// Queue a command from in-process hosts or tests; applied at the start of
/// the next tick.
pub fn queue_command(world: &mut World, payload: CommandPayload) {
    world
        .resource_mut::<PendingCommands>()
        .0
        .push(CommandEnvelope::new(payload));
}

/// Drain and apply everything the host sent since last tick: the in-process
/// queue first, then the channel bridge. Malformed envelopes are dropped
/// with a warning; unknown cells are a logged no-op.
pub fn apply_host_commands(
    mut commands: Commands,
    mut pending: ResMut<PendingCommands>,
    bridge: Option<Res<CommandBridge>>,
    mut ctx: ResMut<ViewerContext>,
    mut selection: ResMut<SelectionEngine>,
    cells: Query<(Entity, &GridCell)>,
) {
    let mut envelopes: Vec<CommandEnvelope> = pending.0.drain(..).collect();
    if let Some(bridge) = bridge {
        for bytes in bridge.drain() {
            match decode_command(&bytes) {
                Ok(envelope) => envelopes.push(envelope),
                Err(err) => log::warn!("Dropping malformed command envelope: {}", err),
            }
        }
    }

    for envelope in envelopes {
        match envelope.payload {
            CommandPayload::SetVisibility { visible } => {
                if ctx.visible != visible {
                    tracing::debug!(visible, "page visibility changed");
                }
                ctx.visible = visible;
            }
            CommandPayload::SetReducedMotion { enabled } => {
                if ctx.reduced_motion != enabled {
                    tracing::debug!(enabled, "reduced motion preference changed");
                }
                ctx.reduced_motion = enabled;
            }
            CommandPayload::SetViewport { wide } => {
                if ctx.wide_viewport != wide {
                    tracing::debug!(wide, "viewport morph capability changed");
                }
                ctx.wide_viewport = wide;
            }
            CommandPayload::RemoveCell { cell } => {
                match cells.iter().find(|(_, grid_cell)| grid_cell.id == cell) {
                    Some((entity, _)) => {
                        commands.entity(entity).despawn();
                        selection.release_slot(cell);
                        tracing::info!(cell = %cell, "cell unmounted");
                    }
                    None => debug!("remove requested for unknown cell {}", cell),
                }
            }
            CommandPayload::Reseed { seed } => {
                selection.reseed(seed);
                tracing::info!(seed, "selection reseeded");
            }
        }
    }
}
