use bevy::prelude::*;

use vitrine_schema::{CellId, CellPhaseTag, CellTraits, DisplayItem, SlotKind};

/// One grid cell entity.
#[derive(Component, Debug, Clone)]
pub struct GridCell {
    pub id: CellId,
    pub column: u8,
    pub row: u8,
    pub traits: CellTraits,
}

impl GridCell {
    pub fn is_gap(&self) -> bool {
        self.traits.contains(CellTraits::DECORATIVE_GAP)
    }
}

/// Which content kind a cell is meant to display.
///
/// `desired` follows the coordinator's photo-row assignment; `seeded` is the
/// kind the cell mounted with and is what narrow (non-morphing) layouts pin
/// to. `last_effective` remembers the kind last acted on so systems can
/// detect the photo↔review morph edges.
#[derive(Component, Debug, Clone, Copy)]
pub struct CellKind {
    pub desired: SlotKind,
    pub seeded: SlotKind,
    pub last_effective: SlotKind,
}

/// The two alternating content layers of a cell.
#[derive(Component, Debug, Clone, Default)]
pub struct CellLayers {
    pub items: [Option<DisplayItem>; 2],
    pub active: usize,
    pub fade_ms: u32,
}

impl CellLayers {
    pub fn active_item(&self) -> Option<&DisplayItem> {
        self.items[self.active].as_ref()
    }

    pub fn hidden_slot(&self) -> usize {
        1 - self.active
    }

    /// Put the next item on the hidden layer, ready for the flip.
    pub fn stage(&mut self, item: DisplayItem) {
        let hidden = self.hidden_slot();
        self.items[hidden] = Some(item);
    }

    pub fn flip(&mut self) {
        self.active = self.hidden_slot();
    }
}

/// Scheduling state machine for one cell.
///
/// `FirstHold` runs the staggered startup delay and is exempt from
/// visibility rescheduling. `Staged` is the one-tick window between picking
/// the next item and committing the layer flip. `Parked` is the explicit
/// no-timer state for a photo cell that is meant to stay a photo; the
/// coordinator re-arms it when the cell's duty changes.
#[derive(Component, Debug, Clone)]
pub enum CellPhase {
    FirstHold { remaining_ms: u64 },
    Staged { fade_ms: u32, first: bool },
    Settling { remaining_ms: u64 },
    Holding { remaining_ms: u64 },
    Parked,
}

impl CellPhase {
    pub fn tag(&self) -> CellPhaseTag {
        match self {
            CellPhase::FirstHold { .. } => CellPhaseTag::FirstHold,
            CellPhase::Staged { .. } => CellPhaseTag::Staged,
            CellPhase::Settling { .. } => CellPhaseTag::Settling,
            CellPhase::Holding { .. } => CellPhaseTag::Holding,
            CellPhase::Parked => CellPhaseTag::Parked,
        }
    }

    pub fn hold_remaining(&self) -> Option<u64> {
        match self {
            CellPhase::FirstHold { remaining_ms }
            | CellPhase::Settling { remaining_ms }
            | CellPhase::Holding { remaining_ms } => Some(*remaining_ms),
            CellPhase::Staged { .. } | CellPhase::Parked => None,
        }
    }

    /// True until the cell's very first transition has committed.
    pub fn is_first_run(&self) -> bool {
        matches!(
            self,
            CellPhase::FirstHold { .. } | CellPhase::Staged { first: true, .. }
        )
    }
}
