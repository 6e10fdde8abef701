use std::collections::{HashMap, VecDeque};

use bevy::prelude::*;

use crate::{
    bridge::FrameBus,
    components::{CellLayers, CellPhase, GridCell},
    resources::{EngineTick, GridLayout, PreloadQueue},
};
use vitrine_schema::{
    encode_delta, encode_frame, CellFrameState, CellId, CellLayerState, FrameDelta, FrameHeader,
    GridFrame, SlotKind,
};

/// Frames captured so far: the latest frame and delta (plus their encoded
/// forms) and a bounded ring of recent frames for hosts that join late.
#[derive(Resource, Default)]
pub struct FrameHistory {
    pub last_frame: Option<GridFrame>,
    pub last_delta: Option<FrameDelta>,
    pub encoded_frame: Option<Vec<u8>>,
    pub encoded_delta: Option<Vec<u8>>,
    cells: HashMap<CellId, CellFrameState>,
    recent: VecDeque<GridFrame>,
    limit: usize,
}

impl FrameHistory {
    pub fn with_capacity(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub fn recent_frames(&self) -> impl Iterator<Item = &GridFrame> {
        self.recent.iter()
    }

    fn update(&mut self, frame: GridFrame) -> FrameDelta {
        let mut index = HashMap::with_capacity(frame.cells.len());
        for state in &frame.cells {
            index.insert(state.cell, state.clone());
        }

        let mut changed = Vec::new();
        for state in &frame.cells {
            match self.cells.get(&state.cell) {
                Some(previous) if previous == state => {}
                _ => changed.push(state.clone()),
            }
        }
        let mut removed: Vec<CellId> = self
            .cells
            .keys()
            .filter(|cell| !index.contains_key(cell))
            .copied()
            .collect();
        removed.sort_unstable();

        let delta = FrameDelta {
            header: frame.header.clone(),
            cells: changed,
            removed_cells: removed,
        };

        self.cells = index;
        self.encoded_frame = encode_frame(&frame).ok();
        self.encoded_delta = encode_delta(&delta).ok();
        self.last_delta = Some(delta.clone());
        self.recent.push_front(frame.clone());
        while self.recent.len() > self.limit.max(1) {
            self.recent.pop_back();
        }
        self.last_frame = Some(frame);
        delta
    }
}

/// End-of-tick capture: turn the live cells into a sorted, hashed frame,
/// fold it into the history and publish the encoded form to any attached
/// host.
pub fn capture_frame(
    tick: Res<EngineTick>,
    layout: Res<GridLayout>,
    cells: Query<(&GridCell, &CellLayers, &CellPhase)>,
    mut preload: ResMut<PreloadQueue>,
    mut history: ResMut<FrameHistory>,
    bus: Option<Res<FrameBus>>,
) {
    let mut states: Vec<CellFrameState> = cells
        .iter()
        .map(|(cell, layers, phase)| cell_state(cell, layers, phase))
        .collect();
    states.sort_unstable_by_key(|state| state.cell);

    let photo_cells = states
        .iter()
        .filter(|state| visible_kind(state) == Some(SlotKind::Photo))
        .count();
    let review_cells = states
        .iter()
        .filter(|state| visible_kind(state) == Some(SlotKind::Review))
        .count();

    let header = FrameHeader::new(tick.0, states.len(), photo_cells, review_cells);
    let frame = GridFrame {
        header,
        cells: states,
        photo_rows: layout.photo_rows.clone(),
        preload: preload.0.drain(..).collect(),
    }
    .finalize();

    history.update(frame);

    if let Some(bus) = bus {
        if let Some(bytes) = history.encoded_frame.as_ref() {
            bus.publish(bytes);
        }
    }
}

fn cell_state(cell: &GridCell, layers: &CellLayers, phase: &CellPhase) -> CellFrameState {
    let active = layers.active.min(1);
    let layer = |slot: usize| CellLayerState {
        item: layers.items[slot].clone(),
        visible: slot == active,
    };
    CellFrameState {
        cell: cell.id,
        column: cell.column,
        row: cell.row,
        traits: cell.traits,
        layers: [layer(0), layer(1)],
        active_layer: active as u8,
        fade_ms: layers.fade_ms,
        phase: phase.tag(),
        hold_remaining_ms: phase.hold_remaining(),
    }
}

fn visible_kind(state: &CellFrameState) -> Option<SlotKind> {
    state.layers[state.active_layer as usize]
        .item
        .as_ref()
        .map(|item| item.kind())
}
