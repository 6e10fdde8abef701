use std::sync::Arc;

use bevy::prelude::*;
use log::debug;
use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};

use crate::{
    components::{CellKind, CellLayers, CellPhase, GridCell},
    metrics::EngineMetrics,
    resources::{
        ContentHandle, EngineConfig, EngineTick, GridLayout, PreloadQueue, ViewerContext,
    },
    selection::SelectionEngine,
    timing,
};
use vitrine_schema::{CellId, CellTraits, DisplayItem, SlotKind};

const SPAWN_SALT: u64 = 0x51AF_F1E5;
const REARM_SALT: u64 = 0x0D15_7A7E;
const RESUME_SALT: u64 = 0x4E5C_0DE5;
const SETTLE_SALT: u64 = 0xBEA7_0A5E;
const TRANSITION_SALT: u64 = 0x7AB1_EA05;
const COMMIT_SALT: u64 = 0xF11B_0B0E;
const MORPH_SALT: u64 = 0xC0A1_E5CE;

/// Per-decision rng, the same scheme the engine uses everywhere: stable for
/// a given (config seed, actor, tick) regardless of iteration order.
fn compose_seed(base: u64, actor: u64, tick: u64, salt: u64) -> u64 {
    base ^ actor.wrapping_mul(0x9E37_79B9) ^ tick.wrapping_mul(0xC2B2_AE35) ^ salt
}

fn decision_rng(config: &EngineConfig, actor: u64, tick: u64, salt: u64) -> SmallRng {
    SmallRng::seed_from_u64(compose_seed(config.seed, actor, tick, salt))
}

enum HoldDecision {
    Hold(u64),
    Park,
}

/// The hold policy: how long a cell dwells on its current content before
/// the next transition, given what it shows and what it should show.
fn hold_decision(
    current: Option<&DisplayItem>,
    effective: SlotKind,
    rng: &mut SmallRng,
) -> HoldDecision {
    let Some(item) = current else {
        return HoldDecision::Hold(timing::startup_hold_ms(rng));
    };
    let current_is_photo = item.kind() == SlotKind::Photo;
    match (current_is_photo, effective) {
        // Morphing either way happens near-immediately so a column is
        // never without its photo for long.
        (true, SlotKind::Review) | (false, SlotKind::Photo) => {
            HoldDecision::Hold(timing::morph_hold_ms(rng))
        }
        (true, SlotKind::Photo) => HoldDecision::Park,
        (false, SlotKind::Review) => {
            let body = match item {
                DisplayItem::Review(record) => record.body.as_deref(),
                DisplayItem::Photo(_) => None,
            };
            HoldDecision::Hold(timing::review_hold_ms(rng, body))
        }
    }
}

fn fresh_hold_phase(
    current: Option<&DisplayItem>,
    effective: SlotKind,
    rng: &mut SmallRng,
) -> CellPhase {
    match hold_decision(current, effective, rng) {
        HoldDecision::Park => CellPhase::Parked,
        HoldDecision::Hold(ms) => CellPhase::Holding { remaining_ms: ms },
    }
}

fn rearmed_phase(
    current: Option<&DisplayItem>,
    effective: SlotKind,
    rng: &mut SmallRng,
) -> CellPhase {
    let lead = timing::reschedule_lead_ms(rng);
    match hold_decision(current, effective, rng) {
        HoldDecision::Park => CellPhase::Parked,
        HoldDecision::Hold(ms) => CellPhase::Holding {
            remaining_ms: lead + ms,
        },
    }
}

/// Startup: lay out the grid, seed initial content and stagger first holds.
pub fn spawn_initial_grid(
    mut commands: Commands,
    config: Res<EngineConfig>,
    content: Res<ContentHandle>,
    ctx: Res<ViewerContext>,
    mut selection: ResMut<SelectionEngine>,
    mut layout: ResMut<GridLayout>,
) {
    let library = Arc::clone(&content.0);
    let mut rng = decision_rng(&config, 0, 0, SPAWN_SALT);

    let total = config.cell_count();
    let content_cells = (total as usize).saturating_sub(config.gap_cells.len());
    let mut delays = timing::first_hold_schedule(&mut rng, content_cells).into_iter();

    let mut review_sample: Vec<usize> = (0..library.review_count()).collect();
    review_sample.shuffle(&mut rng);
    let mut review_sample = review_sample.into_iter();

    for cell_index in 0..total {
        let column = (cell_index % config.columns as u32) as u8;
        let row = (cell_index / config.columns as u32) as u8;
        let id = CellId(cell_index);

        if config.is_gap(cell_index) {
            commands.spawn((
                GridCell {
                    id,
                    column,
                    row,
                    traits: CellTraits::DECORATIVE_GAP,
                },
                CellKind {
                    desired: SlotKind::Review,
                    seeded: SlotKind::Review,
                    last_effective: SlotKind::Review,
                },
                CellLayers::default(),
                CellPhase::Parked,
            ));
            continue;
        }

        let photo_seed = config
            .photo_seeds
            .iter()
            .find(|seed| seed.cell == cell_index)
            .copied();

        let mut traits = CellTraits::MORPHABLE;
        let seeded_item = if let Some(seed) = photo_seed {
            traits |= CellTraits::PHOTO_SEEDED;
            library
                .photos()
                .get(seed.photo_index)
                .cloned()
                .map(DisplayItem::Photo)
        } else {
            review_sample
                .next()
                .map(|index| DisplayItem::Review(library.review(index).clone()))
        };

        let desired = if layout.photo_cell(column, config.columns) == cell_index {
            SlotKind::Photo
        } else {
            SlotKind::Review
        };
        let seeded_kind = seeded_item
            .as_ref()
            .map(DisplayItem::kind)
            .unwrap_or(SlotKind::Review);
        let effective = if ctx.wide_viewport { desired } else { seeded_kind };

        // A cell that mounted without a seed asks the picker right away,
        // avoiding whatever earlier cells already took.
        let item = seeded_item.or_else(|| {
            let avoid = selection.occupied();
            selection.pick_next(effective, &avoid)
        });
        if let Some(ref item) = item {
            selection.register_slot(id, item.slot_identity());
        }

        let layers = CellLayers {
            items: [item, None],
            active: 0,
            fade_ms: timing::fade_ms(&mut rng),
        };
        let phase = CellPhase::FirstHold {
            remaining_ms: delays.next().unwrap_or(0),
        };

        commands.spawn((
            GridCell {
                id,
                column,
                row,
                traits,
            },
            CellKind {
                desired,
                seeded: seeded_kind,
                last_effective: effective,
            },
            layers,
            phase,
        ));
    }

    layout.morph_remaining_ms = if ctx.wide_viewport && ctx.motion_enabled() {
        Some(rng.gen_range(config.morph_interval_min_ms..=config.morph_interval_max_ms))
    } else {
        None
    };

    tracing::info!(
        cells = total,
        gaps = config.gap_cells.len(),
        "grid seeded"
    );
}

/// Commit the layer flips staged last tick: flip the visible layer, adopt
/// the new fade, register the new occupancy and start the settling pause.
pub fn commit_staged_flips(
    config: Res<EngineConfig>,
    tick: Res<EngineTick>,
    mut selection: ResMut<SelectionEngine>,
    mut metrics: ResMut<EngineMetrics>,
    mut cells: Query<(&GridCell, &mut CellLayers, &mut CellPhase)>,
) {
    for (cell, mut layers, mut phase) in cells.iter_mut() {
        let CellPhase::Staged { fade_ms, first } = *phase else {
            continue;
        };

        layers.flip();
        layers.fade_ms = fade_ms;
        let Some(item) = layers.active_item().cloned() else {
            // Nothing staged after all; drop back into a plain hold.
            let mut rng = decision_rng(&config, cell.id.0 as u64, tick.0, COMMIT_SALT);
            *phase = fresh_hold_phase(None, SlotKind::Review, &mut rng);
            continue;
        };

        selection.register_slot(cell.id, item.slot_identity());
        metrics.transitions_committed += 1;

        let mut rng = decision_rng(&config, cell.id.0 as u64, tick.0, COMMIT_SALT);
        let breath = timing::breath_ms(&mut rng, item.kind());
        *phase = CellPhase::Settling {
            remaining_ms: fade_ms as u64 + breath,
        };

        if first {
            tracing::debug!(cell = %cell.id, identity = %item.slot_identity(), "first transition committed");
        }
    }
}

/// Coordinator output: derive each cell's desired kind from the photo-row
/// map and reschedule cells whose effective kind just changed.
pub fn assign_desired_kinds(
    config: Res<EngineConfig>,
    ctx: Res<ViewerContext>,
    tick: Res<EngineTick>,
    layout: Res<GridLayout>,
    mut cells: Query<(&GridCell, &mut CellKind, &CellLayers, &mut CellPhase)>,
) {
    for (cell, mut kind, layers, mut phase) in cells.iter_mut() {
        if cell.is_gap() {
            continue;
        }

        let desired = if layout.photo_cell(cell.column, config.columns) == cell.id.0 {
            SlotKind::Photo
        } else {
            SlotKind::Review
        };
        kind.desired = desired;

        let effective = if ctx.wide_viewport && cell.traits.contains(CellTraits::MORPHABLE) {
            desired
        } else {
            kind.seeded
        };
        if effective == kind.last_effective {
            continue;
        }
        kind.last_effective = effective;

        if !ctx.motion_enabled() {
            continue;
        }
        if matches!(*phase, CellPhase::Staged { .. }) {
            continue;
        }

        let mut rng = decision_rng(&config, cell.id.0 as u64, tick.0, REARM_SALT);
        *phase = rearmed_phase(layers.active_item(), effective, &mut rng);
    }
}

/// Visibility / reduced-motion resume: discard stale countdowns and arm
/// fresh holds. Cells still in their first run keep their original
/// schedule.
pub fn reconcile_motion_edges(
    config: Res<EngineConfig>,
    ctx: Res<ViewerContext>,
    tick: Res<EngineTick>,
    mut cells: Query<(&GridCell, &CellKind, &CellLayers, &mut CellPhase)>,
) {
    let resumed_visibility = ctx.visible && !ctx.was_visible;
    let resumed_motion = ctx.motion_enabled() && ctx.was_reduced;
    if !(resumed_visibility || resumed_motion) {
        return;
    }

    for (cell, kind, layers, mut phase) in cells.iter_mut() {
        if cell.is_gap() || phase.is_first_run() || matches!(*phase, CellPhase::Staged { .. }) {
            continue;
        }
        let mut rng = decision_rng(&config, cell.id.0 as u64, tick.0, RESUME_SALT);
        *phase = fresh_hold_phase(layers.active_item(), kind.last_effective, &mut rng);
    }
    tracing::debug!(
        visibility = resumed_visibility,
        motion = resumed_motion,
        "schedules rebuilt after resume"
    );
}

/// Count down the per-cell timers.
///
/// First holds run even while the page is hidden (the seed transition is
/// allowed to complete on its original schedule); ordinary holds only
/// advance while visible. Reduced motion freezes everything.
pub fn advance_holds(
    config: Res<EngineConfig>,
    ctx: Res<ViewerContext>,
    tick: Res<EngineTick>,
    mut cells: Query<(&GridCell, &CellKind, &CellLayers, &mut CellPhase)>,
) {
    if !ctx.motion_enabled() {
        return;
    }
    let step = config.tick_ms;

    for (cell, kind, layers, mut phase) in cells.iter_mut() {
        if cell.is_gap() {
            continue;
        }
        match &mut *phase {
            CellPhase::FirstHold { remaining_ms } => {
                *remaining_ms = remaining_ms.saturating_sub(step);
            }
            CellPhase::Settling { remaining_ms } => {
                *remaining_ms = remaining_ms.saturating_sub(step);
                if *remaining_ms == 0 {
                    let mut rng = decision_rng(&config, cell.id.0 as u64, tick.0, SETTLE_SALT);
                    *phase = fresh_hold_phase(layers.active_item(), kind.last_effective, &mut rng);
                }
            }
            CellPhase::Holding { remaining_ms } => {
                if ctx.visible {
                    *remaining_ms = remaining_ms.saturating_sub(step);
                }
            }
            CellPhase::Staged { .. } | CellPhase::Parked => {}
        }
    }
}

/// Run expired holds: pick the next item and stage it on the hidden layer.
/// The flip commits next tick, mirroring a render-frame boundary.
pub fn run_transitions(
    config: Res<EngineConfig>,
    ctx: Res<ViewerContext>,
    tick: Res<EngineTick>,
    mut selection: ResMut<SelectionEngine>,
    mut preload: ResMut<PreloadQueue>,
    mut metrics: ResMut<EngineMetrics>,
    mut cells: Query<(&GridCell, &CellKind, &mut CellLayers, &mut CellPhase)>,
) {
    if !ctx.motion_enabled() {
        return;
    }

    for (cell, kind, mut layers, mut phase) in cells.iter_mut() {
        if cell.is_gap() {
            continue;
        }
        let (expired, first) = match *phase {
            CellPhase::FirstHold { remaining_ms: 0 } => (true, true),
            CellPhase::Holding { remaining_ms: 0 } => (true, false),
            _ => (false, false),
        };
        if !expired {
            continue;
        }

        let mut rng = decision_rng(&config, cell.id.0 as u64, tick.0, TRANSITION_SALT);
        let effective = kind.last_effective;

        // A photo that is still meant to be a photo does not reshuffle
        // into a different photo; it parks until reassigned.
        let current_is_photo = layers
            .active_item()
            .map(|item| item.kind() == SlotKind::Photo)
            .unwrap_or(false);
        if current_is_photo && effective == SlotKind::Photo {
            *phase = CellPhase::Parked;
            continue;
        }

        let avoid = selection.occupied();
        let Some(item) = selection.pick_next(effective, &avoid) else {
            // Cosmetic subsystem: a dry pick skips this cycle and retries
            // on the next hold expiry.
            metrics.picks_failed += 1;
            debug!("cell {} found no candidate, retrying later", cell.id);
            *phase = fresh_hold_phase(layers.active_item(), effective, &mut rng);
            continue;
        };
        metrics.picks_served += 1;

        if let DisplayItem::Photo(photo) = &item {
            preload.0.push(photo.public_id.clone());
        }

        let fade = timing::fade_ms(&mut rng);
        layers.stage(item);
        *phase = CellPhase::Staged {
            fade_ms: fade,
            first,
        };
    }
}

/// Periodically move one column's photo row, keeping photo cells off each
/// other's shoulders.
pub fn rotate_photo_rows(
    config: Res<EngineConfig>,
    ctx: Res<ViewerContext>,
    tick: Res<EngineTick>,
    mut layout: ResMut<GridLayout>,
    mut metrics: ResMut<EngineMetrics>,
) {
    if !(ctx.wide_viewport && ctx.motion_enabled()) {
        layout.morph_remaining_ms = None;
        return;
    }

    let mut rng = decision_rng(&config, 0, tick.0, MORPH_SALT);
    let Some(previous) = layout.morph_remaining_ms else {
        layout.morph_remaining_ms =
            Some(rng.gen_range(config.morph_interval_min_ms..=config.morph_interval_max_ms));
        return;
    };

    let remaining = previous.saturating_sub(config.tick_ms);
    if remaining > 0 {
        layout.morph_remaining_ms = Some(remaining);
        return;
    }

    let mut columns: Vec<usize> = (0..config.columns as usize).collect();
    columns.shuffle(&mut rng);
    for column in columns {
        if let Some(new_row) = layout.reassign_column(column, &mut rng) {
            metrics.morphs_applied += 1;
            debug!("photo row for column {} moved to {}", column, new_row);
            break;
        }
    }

    layout.morph_remaining_ms =
        Some(rng.gen_range(config.morph_interval_min_ms..=config.morph_interval_max_ms));
}

/// Close the tick: bump the counter and snapshot the viewer flags for next
/// tick's edge detection.
pub fn advance_tick(mut tick: ResMut<EngineTick>, mut ctx: ResMut<ViewerContext>) {
    tick.0 += 1;
    ctx.was_visible = ctx.visible;
    ctx.was_reduced = ctx.reduced_motion;
}
