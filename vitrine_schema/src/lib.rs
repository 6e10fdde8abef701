//! Data contracts for the Vitrine showcase engine.
//!
//! Holds the content records (reviews, photos), the display-item union with
//! its slot identity, and the render-frame structs the engine emits each
//! tick. Hosts consume frames either as decoded structs or through the
//! bincode/JSON wire helpers at the bottom of this module.

use ahash::RandomState;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::{BuildHasher, Hasher};
use thiserror::Error;

/// Stable identity of a review record within a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub String);

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque public id of a remote image asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(pub String);

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for one grid cell.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct CellId(pub u32);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Attribution badge shown next to a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSource {
    #[default]
    Google,
    Thumbtack,
}

/// A single client review. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: ReviewId,
    pub display_name: String,
    pub rating: u8,
    #[serde(default)]
    pub avatar: Option<PhotoId>,
    #[serde(default)]
    pub source: ReviewSource,
    #[serde(default)]
    pub body: Option<String>,
}

impl ReviewRecord {
    /// Whether the review carries free text (after trimming).
    pub fn has_text(&self) -> bool {
        self.body
            .as_deref()
            .map(|text| !text.trim().is_empty())
            .unwrap_or(false)
    }
}

/// A photo asset reference. Pure value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoRef {
    pub public_id: PhotoId,
}

/// The two content kinds a cell can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Review,
    Photo,
}

/// Content bound to one cell layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayItem {
    Review(ReviewRecord),
    Photo(PhotoRef),
}

impl DisplayItem {
    pub fn kind(&self) -> SlotKind {
        match self {
            DisplayItem::Review(_) => SlotKind::Review,
            DisplayItem::Photo(_) => SlotKind::Photo,
        }
    }

    /// Identity used for duplicate detection across cells and over time.
    pub fn slot_identity(&self) -> SlotIdentity {
        match self {
            DisplayItem::Review(record) => SlotIdentity::Review(record.id.clone()),
            DisplayItem::Photo(photo) => SlotIdentity::Photo(photo.public_id.clone()),
        }
    }
}

/// Stable de-duplication key: record id for reviews, public id for photos.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SlotIdentity {
    Review(ReviewId),
    Photo(PhotoId),
}

impl fmt::Display for SlotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotIdentity::Review(id) => write!(f, "review:{}", id),
            SlotIdentity::Photo(id) => write!(f, "photo:{}", id),
        }
    }
}

bitflags::bitflags! {
    /// Static capabilities of a grid cell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CellTraits: u8 {
        /// The coordinator may flip this cell between photo and review duty.
        const MORPHABLE = 1 << 0;
        /// The cell started life holding a seeded photo.
        const PHOTO_SEEDED = 1 << 1;
        /// Decorative gap: never holds content.
        const DECORATIVE_GAP = 1 << 2;
    }
}

impl Serialize for CellTraits {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for CellTraits {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u8::deserialize(deserializer)?;
        Ok(CellTraits::from_bits_truncate(bits))
    }
}

/// Coarse phase tag exported with each cell so hosts can annotate cells
/// (e.g. "settling" vs "parked") without knowing engine internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellPhaseTag {
    FirstHold,
    Staged,
    Settling,
    Holding,
    Parked,
}

/// One of the two alternating content layers of a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CellLayerState {
    pub item: Option<DisplayItem>,
    pub visible: bool,
}

/// Render instruction for a single cell: two layers, which one is visible,
/// and how long the opacity cross-fade between them runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellFrameState {
    pub cell: CellId,
    pub column: u8,
    pub row: u8,
    pub traits: CellTraits,
    pub layers: [CellLayerState; 2],
    pub active_layer: u8,
    pub fade_ms: u32,
    pub phase: CellPhaseTag,
    /// Milliseconds until the next scheduled transition, if one is armed.
    pub hold_remaining_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FrameHeader {
    pub tick: u64,
    pub cell_count: u32,
    pub photo_cells: u32,
    pub review_cells: u32,
    pub hash: u64,
}

impl FrameHeader {
    pub fn new(tick: u64, cell_count: usize, photo_cells: usize, review_cells: usize) -> Self {
        Self {
            tick,
            cell_count: cell_count as u32,
            photo_cells: photo_cells as u32,
            review_cells: review_cells as u32,
            hash: 0,
        }
    }
}

/// Full render frame for one engine tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GridFrame {
    pub header: FrameHeader,
    pub cells: Vec<CellFrameState>,
    /// Per column, the row currently assigned photo duty.
    pub photo_rows: Vec<u8>,
    /// Photo assets staged this tick; hosts should begin fetching them
    /// before the cross-fade reveals the layer.
    pub preload: Vec<PhotoId>,
}

impl GridFrame {
    /// Stamp the stable content hash into the header.
    pub fn finalize(mut self) -> Self {
        let hash = hash_frame(&self);
        self.header.hash = hash;
        self
    }

    /// Structural sanity check for host-side consumption.
    pub fn validate(&self) -> Result<(), FrameError> {
        let mut seen = HashSet::new();
        for cell in &self.cells {
            if !seen.insert(cell.cell) {
                return Err(FrameError::DuplicateCell(cell.cell));
            }
            if cell.active_layer > 1 {
                return Err(FrameError::InvalidActiveLayer {
                    cell: cell.cell,
                    layer: cell.active_layer,
                });
            }
        }
        if self.header.cell_count as usize != self.cells.len() {
            return Err(FrameError::CountMismatch {
                header: self.header.cell_count,
                actual: self.cells.len(),
            });
        }
        Ok(())
    }
}

/// Changed-cell delta between two consecutive frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FrameDelta {
    pub header: FrameHeader,
    pub cells: Vec<CellFrameState>,
    pub removed_cells: Vec<CellId>,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("cell {0} appears more than once in frame")]
    DuplicateCell(CellId),
    #[error("cell {cell} reports active layer {layer}, expected 0 or 1")]
    InvalidActiveLayer { cell: CellId, layer: u8 },
    #[error("header claims {header} cells but frame carries {actual}")]
    CountMismatch { header: u32, actual: usize },
}

/// Hash of a frame with the hash field zeroed, using fixed-seed ahash so the
/// value is stable across processes.
pub fn hash_frame(frame: &GridFrame) -> u64 {
    let mut clone = frame.clone();
    clone.header.hash = 0;
    let encoded = bincode::serialize(&clone).expect("frame serialization for hashing");
    let mut hasher = RandomState::with_seeds(0, 0, 0, 0).build_hasher();
    hasher.write(&encoded);
    hasher.finish()
}

pub fn encode_frame(frame: &GridFrame) -> bincode::Result<Vec<u8>> {
    bincode::serialize(frame)
}

pub fn decode_frame(data: &[u8]) -> bincode::Result<GridFrame> {
    bincode::deserialize(data)
}

pub fn encode_delta(delta: &FrameDelta) -> bincode::Result<Vec<u8>> {
    bincode::serialize(delta)
}

pub fn decode_delta(data: &[u8]) -> bincode::Result<FrameDelta> {
    bincode::deserialize(data)
}

pub fn encode_frame_json(frame: &GridFrame) -> serde_json::Result<String> {
    serde_json::to_string(frame)
}

pub fn decode_frame_json(data: &str) -> serde_json::Result<GridFrame> {
    serde_json::from_str(data)
}

pub fn encode_delta_json(delta: &FrameDelta) -> serde_json::Result<String> {
    serde_json::to_string(delta)
}

pub fn decode_delta_json(data: &str) -> serde_json::Result<FrameDelta> {
    serde_json::from_str(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_review(id: &str, body: Option<&str>) -> ReviewRecord {
        ReviewRecord {
            id: ReviewId(id.to_string()),
            display_name: "Client".to_string(),
            rating: 5,
            avatar: None,
            source: ReviewSource::Google,
            body: body.map(str::to_string),
        }
    }

    fn sample_frame() -> GridFrame {
        let review = sample_review("featured-0", Some("Wonderful photos."));
        let photo = PhotoRef {
            public_id: PhotoId("center_city_ag1h8b".to_string()),
        };
        GridFrame {
            header: FrameHeader::new(7, 2, 1, 1),
            cells: vec![
                CellFrameState {
                    cell: CellId(0),
                    column: 0,
                    row: 0,
                    traits: CellTraits::MORPHABLE,
                    layers: [
                        CellLayerState {
                            item: Some(DisplayItem::Review(review)),
                            visible: true,
                        },
                        CellLayerState::default(),
                    ],
                    active_layer: 0,
                    fade_ms: 2600,
                    phase: CellPhaseTag::Holding,
                    hold_remaining_ms: Some(14_000),
                },
                CellFrameState {
                    cell: CellId(1),
                    column: 1,
                    row: 0,
                    traits: CellTraits::MORPHABLE | CellTraits::PHOTO_SEEDED,
                    layers: [
                        CellLayerState {
                            item: Some(DisplayItem::Photo(photo)),
                            visible: true,
                        },
                        CellLayerState::default(),
                    ],
                    active_layer: 0,
                    fade_ms: 3000,
                    phase: CellPhaseTag::Parked,
                    hold_remaining_ms: None,
                },
            ],
            photo_rows: vec![0, 0],
            preload: Vec::new(),
        }
        .finalize()
    }

    #[test]
    fn has_text_trims_whitespace() {
        assert!(!sample_review("a", None).has_text());
        assert!(!sample_review("b", Some("   ")).has_text());
        assert!(sample_review("c", Some("great")).has_text());
    }

    #[test]
    fn slot_identity_distinguishes_kinds() {
        let review = DisplayItem::Review(sample_review("featured-0", None));
        let photo = DisplayItem::Photo(PhotoRef {
            public_id: PhotoId("featured-0".to_string()),
        });
        assert_ne!(review.slot_identity(), photo.slot_identity());
        assert_eq!(format!("{}", photo.slot_identity()), "photo:featured-0");
    }

    #[test]
    fn frame_hash_is_stable_and_ignores_itself() {
        let frame = sample_frame();
        assert_ne!(frame.header.hash, 0);
        let rehash = hash_frame(&frame);
        assert_eq!(frame.header.hash, rehash);

        let mut changed = frame.clone();
        changed.cells[0].fade_ms = 1800;
        assert_ne!(hash_frame(&changed), frame.header.hash);
    }

    #[test]
    fn frame_roundtrips_through_bincode_and_json() {
        let frame = sample_frame();
        let bytes = encode_frame(&frame).expect("encode");
        let decoded = decode_frame(&bytes).expect("decode");
        assert_eq!(decoded, frame);

        let json = encode_frame_json(&frame).expect("encode json");
        let decoded = decode_frame_json(&json).expect("decode json");
        assert_eq!(decoded, frame);
    }

    #[test]
    fn delta_roundtrips_through_bincode_and_json() {
        let frame = sample_frame();
        let delta = FrameDelta {
            header: frame.header.clone(),
            cells: vec![frame.cells[1].clone()],
            removed_cells: vec![CellId(7)],
        };

        let bytes = encode_delta(&delta).expect("encode");
        assert_eq!(decode_delta(&bytes).expect("decode"), delta);

        let json = encode_delta_json(&delta).expect("encode json");
        assert_eq!(decode_delta_json(&json).expect("decode json"), delta);
    }

    #[test]
    fn validate_rejects_duplicate_cells() {
        let mut frame = sample_frame();
        frame.cells[1].cell = CellId(0);
        assert!(matches!(
            frame.validate(),
            Err(FrameError::DuplicateCell(CellId(0)))
        ));
    }

    #[test]
    fn validate_checks_header_count() {
        let mut frame = sample_frame();
        frame.header.cell_count = 5;
        assert!(matches!(
            frame.validate(),
            Err(FrameError::CountMismatch { header: 5, .. })
        ));
    }
}
