use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a recording in the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct RecordingId(Uuid);

impl RecordingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Name-based id, stable across sessions for the same locator.
    pub fn for_locator(locator: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, locator.as_bytes()))
    }
}

impl Default for RecordingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display only the first 8 characters for brevity
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Unique identifier for a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct PlacementId(Uuid);

impl PlacementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlacementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlacementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Unified error type for the garden crates.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub mod capabilities;
pub mod events;
pub mod grid;
pub mod keys;
pub mod model;

pub use capabilities::{AssetSource, Decoder};
pub use events::{Action, GardenCommand, GardenEvent};
pub use grid::{Cell, Direction, Grid};
pub use keys::{Binding, Key, KeyBindings, KeyInput};
pub use model::{
    DecodedAudio, OriginKind, Placement, PlacementParams, ParamsUpdate, RecordingMeta,
};

/// Decoded audio shared between the library and the playback engine.
pub type SharedAudio = Arc<DecodedAudio>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_id_display() {
        let id = RecordingId::new();
        let display = format!("{}", id);
        assert_eq!(display.len(), 8);
        assert_eq!(display, &id.0.to_string()[..8]);
    }

    #[test]
    fn locator_ids_are_stable() {
        let a = RecordingId::for_locator("sounds/rain.ogg");
        let b = RecordingId::for_locator("sounds/rain.ogg");
        let c = RecordingId::for_locator("sounds/wind.ogg");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn ids_serialize_as_bare_uuids() {
        let id = PlacementId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.0));
        let back: PlacementId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn error_display() {
        let io_err = Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        assert!(format!("{}", io_err).contains("I/O error: file not found"));

        let decode_err = Error::Decode("unsupported codec".to_string());
        assert!(format!("{}", decode_err).contains("Decode error: unsupported codec"));

        let anyhow_err = Error::Other(anyhow::anyhow!("Something went wrong"));
        assert!(format!("{}", anyhow_err).contains("Something went wrong"));
    }
}
