use crate::{Cell, Direction, KeyInput, PlacementId, RecordingId};

/// State-change notifications emitted by the garden controller.
#[derive(Debug, Clone, PartialEq)]
pub enum GardenEvent {
    /// The cursor moved (or was initialised)
    CursorMoved(Option<Cell>),
    /// The in-progress region changed
    RegionChanged,
    /// A placement was created
    PlacementAdded(PlacementId),
    /// A placement was removed
    PlacementRemoved(PlacementId),
    /// A placement's parameters changed
    PlacementUpdated(PlacementId),
    /// A recording entered the library (possibly without a buffer)
    RecordingAdded(RecordingId),
    /// A recording's buffer finished decoding
    RecordingResolved(RecordingId),
    /// A recording left the library
    RecordingRemoved(RecordingId),
    /// The chooser opened, closed, or its filter/selection changed
    ChooserChanged,
    /// A message meant for the user
    Notice(String),
}

impl GardenEvent {
    /// Whether the placement store changed.
    pub fn touches_placements(&self) -> bool {
        matches!(
            self,
            GardenEvent::PlacementAdded(_)
                | GardenEvent::PlacementRemoved(_)
                | GardenEvent::PlacementUpdated(_)
        )
    }

    /// Whether the library store changed.
    pub fn touches_library(&self) -> bool {
        matches!(
            self,
            GardenEvent::RecordingAdded(_)
                | GardenEvent::RecordingResolved(_)
                | GardenEvent::RecordingRemoved(_)
        )
    }
}

/// Interpreted user intent, produced by the input router.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Move the cursor; `extend` grows the region instead of clearing it
    Move { direction: Direction, extend: bool },
    /// Remove the placement under the cursor
    DeleteAtCursor,
    /// Open the chooser seeded with a character
    OpenChooser(char),
    /// Append a character to the chooser filter
    ChooserInput(char),
    /// Drop the last character of the chooser filter
    ChooserErase,
    ChooserUp,
    ChooserDown,
    /// Commit the highlighted recording
    ChooserConfirm,
    /// Delete the highlighted recording from the library
    RemoveSelectedRecording,
    /// Change the volume of the placement under the cursor
    AdjustVolume(f32),
    /// Change the radius of the placement under the cursor
    AdjustRadius(f32),
    /// Shift the loop start of the placement under the cursor
    AdjustTiming(f32),
    /// Close the chooser and clear the region
    Cancel,
}

/// Commands sent to the garden handler
#[derive(Debug, Clone)]
pub enum GardenCommand {
    /// A raw key press, routed through the key table
    Key(KeyInput),
    /// An already-interpreted action
    Perform(Action),
    /// Add a user-supplied recording
    Upload {
        /// Display name
        name: String,
        /// Encoded audio bytes
        payload: Vec<u8>,
    },
    /// Add catalog entries by locator
    IngestManifest(Vec<String>),
    /// Stop the handler and release all voices
    Shutdown,
}
