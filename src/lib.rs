// Soundgarden: spatial audio on a grid
// Expose the workspace crates for use in integration tests

pub use audio;
pub use garden;
pub use garden_core;
pub use settings_manager;
pub use spatial;

// Re-export commonly used types for convenience
pub use garden::{ControllerConfig, GardenController, GardenHandler, GardenSnapshot};
pub use garden_core::{Cell, GardenCommand, GardenEvent, Grid, Key, KeyInput, RecordingId};
