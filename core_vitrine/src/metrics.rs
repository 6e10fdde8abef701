use bevy::prelude::*;

use crate::{
    components::{CellPhase, GridCell},
    resources::EngineTick,
    selection::SelectionEngine,
};

/// Rolling counters for the engine's cosmetic health: a failed pick or a
/// transient duplicate is never an error, but hosts and tests want to see
/// how often the degradation paths fire.
#[derive(Resource, Default, Debug, Clone)]
pub struct EngineMetrics {
    pub tick: u64,
    pub transitions_committed: u64,
    pub picks_served: u64,
    pub picks_failed: u64,
    pub morphs_applied: u64,
    pub parked_cells: u32,
    pub occupied_slots: u32,
    pub distinct_identities: u32,
    pub slot_collisions: u64,
}

pub fn collect_metrics(
    tick: Res<EngineTick>,
    selection: Res<SelectionEngine>,
    cells: Query<(&GridCell, &CellPhase)>,
    mut metrics: ResMut<EngineMetrics>,
) {
    metrics.tick = tick.0;
    metrics.parked_cells = cells
        .iter()
        .filter(|(cell, phase)| !cell.is_gap() && matches!(phase, CellPhase::Parked))
        .count() as u32;
    metrics.occupied_slots = selection.slot_count() as u32;
    metrics.distinct_identities = selection.distinct_identities() as u32;
    metrics.slot_collisions = selection.collisions();
}
