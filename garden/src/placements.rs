//! Active placements, the durable source of truth for what plays where.

use garden_core::{
    Cell, Error, ParamsUpdate, Placement, PlacementId, PlacementParams, RecordingId,
};
use log::debug;

/// Placements in creation order.
#[derive(Debug, Default)]
pub struct PlacementStore {
    placements: Vec<Placement>,
    defaults: PlacementParams,
}

impl PlacementStore {
    /// Creates an empty store whose new placements start from `defaults`.
    pub fn new(defaults: PlacementParams) -> Self {
        Self {
            placements: Vec::new(),
            defaults,
        }
    }

    pub fn defaults(&self) -> PlacementParams {
        self.defaults
    }

    pub fn all(&self) -> &[Placement] {
        &self.placements
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn get(&self, id: PlacementId) -> Option<&Placement> {
        self.placements.iter().find(|p| p.id == id)
    }

    /// Adds a placement over `cells`. Empty cell lists are ignored.
    ///
    /// `recording_id` does not have to resolve yet.
    pub fn create(
        &mut self,
        cells: Vec<Cell>,
        recording_id: RecordingId,
        overrides: &ParamsUpdate,
    ) -> Option<PlacementId> {
        if cells.is_empty() {
            debug!("Ignoring placement with no cells");
            return None;
        }
        let placement = Placement {
            id: PlacementId::new(),
            cells,
            recording_id,
            params: self.defaults.merged(overrides),
        };
        debug!(
            "Created placement {} over {} cells for {}",
            placement.id,
            placement.cells.len(),
            recording_id
        );
        let id = placement.id;
        self.placements.push(placement);
        Some(id)
    }

    pub fn remove(&mut self, id: PlacementId) -> Option<Placement> {
        let index = self.placements.iter().position(|p| p.id == id)?;
        debug!("Removed placement {}", id);
        Some(self.placements.remove(index))
    }

    /// Merges `update` into the placement's params. Cells and recording
    /// stay as they are.
    pub fn update_params(
        &mut self,
        id: PlacementId,
        update: &ParamsUpdate,
    ) -> Result<PlacementParams, Error> {
        let placement = self
            .placements
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("placement {}", id)))?;
        placement.params = placement.params.merged(update);
        debug!("Placement {} params now {:?}", id, placement.params);
        Ok(placement.params)
    }

    /// Removes every placement bound to `recording_id`.
    pub fn remove_by_recording(&mut self, recording_id: RecordingId) -> Vec<PlacementId> {
        let mut removed = Vec::new();
        self.placements.retain(|p| {
            if p.recording_id == recording_id {
                removed.push(p.id);
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            debug!(
                "Removed {} placements bound to {}",
                removed.len(),
                recording_id
            );
        }
        removed
    }

    /// The placement covering `cell`.
    ///
    /// Placements may overlap; the most recently created one wins.
    pub fn find_containing(&self, cell: Cell) -> Option<&Placement> {
        self.placements.iter().rev().find(|p| p.contains(cell))
    }

    /// Replaces the contents with persisted placements, dropping any with
    /// no cells.
    pub fn restore(&mut self, placements: Vec<Placement>) {
        self.placements = placements
            .into_iter()
            .filter(|p| !p.cells.is_empty())
            .collect();
    }
}
