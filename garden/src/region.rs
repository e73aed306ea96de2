//! In-progress multi-cell selection built from modifier + direction input.

use garden_core::Cell;
use log::trace;

/// Whether a region is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    Idle,
    Building,
}

/// Ordered path of distinct cells.
///
/// Revisiting a cell already on the path trims the path back to that cell
/// instead of appending, so the path never holds repeats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionSelection {
    cells: Vec<Cell>,
}

impl RegionSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RegionState {
        if self.cells.is_empty() {
            RegionState::Idle
        } else {
            RegionState::Building
        }
    }

    pub fn is_building(&self) -> bool {
        self.state() == RegionState::Building
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    /// Extends the path from `cursor` to `next`.
    ///
    /// When idle, `cursor` becomes the anchor. A `next` equal to a cell on
    /// the path (including the clamped no-op at a grid edge) trims the path
    /// to end there.
    pub fn extend(&mut self, cursor: Cell, next: Cell) {
        if self.cells.is_empty() {
            self.cells.push(cursor);
        }
        match self.cells.iter().position(|cell| *cell == next) {
            Some(index) => {
                self.cells.truncate(index + 1);
                trace!("Region trimmed to {} cells at {}", self.cells.len(), next);
            }
            None => {
                self.cells.push(next);
                trace!("Region grew to {} cells at {}", self.cells.len(), next);
            }
        }
    }

    /// Drops the path. Returns whether anything was cleared.
    pub fn clear(&mut self) -> bool {
        let had_cells = !self.cells.is_empty();
        self.cells.clear();
        had_cells
    }

    /// Hands over the path for a commit, leaving the selection idle.
    pub fn take(&mut self) -> Vec<Cell> {
        std::mem::take(&mut self.cells)
    }
}
