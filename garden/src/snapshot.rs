//! Read-only view of the garden for front-ends.

use garden_core::{Cell, OriginKind, PlacementId, PlacementParams, RecordingId};

#[derive(Debug, Clone, PartialEq)]
pub struct PlacementView {
    pub id: PlacementId,
    pub cells: Vec<Cell>,
    pub recording_id: RecordingId,
    /// Recording name, or `None` when the recording is unknown
    pub recording_name: Option<String>,
    pub params: PlacementParams,
    /// Whether a voice is playing for this placement
    pub playing: bool,
    /// Gain at the current cursor
    pub gain: f32,
    pub pan: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordingView {
    pub id: RecordingId,
    pub name: String,
    pub origin: OriginKind,
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChooserView {
    pub query: String,
    pub matches: Vec<RecordingView>,
    pub selected: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GardenSnapshot {
    pub cols: u32,
    pub rows: u32,
    pub cursor: Option<Cell>,
    pub region: Vec<Cell>,
    pub placements: Vec<PlacementView>,
    pub recordings: Vec<RecordingView>,
    pub chooser: Option<ChooserView>,
    pub status: Option<String>,
}

impl GardenSnapshot {
    /// The placement drawn on `cell`: the most recently created one.
    pub fn placement_at(&self, cell: Cell) -> Option<&PlacementView> {
        self.placements.iter().rev().find(|p| p.cells.contains(&cell))
    }

    pub fn in_region(&self, cell: Cell) -> bool {
        self.region.contains(&cell)
    }
}
