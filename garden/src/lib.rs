//! Garden state management
//!
//! This crate owns everything a session mutates: the cursor, the region
//! being selected, the recording library, the placements, and the chooser.
//! [`GardenController`] applies input and job results synchronously;
//! [`GardenHandler`] runs it on a tokio task alongside the fetch and decode
//! work it schedules.

pub mod assets;
pub mod chooser;
pub mod controller;
pub mod handler;
pub mod jobs;
pub mod library;
pub mod manifest;
pub mod persistence;
pub mod placements;
pub mod region;
pub mod router;
pub mod snapshot;

pub use assets::StoreAssets;
pub use chooser::Chooser;
pub use controller::{ControllerConfig, GardenController};
pub use handler::GardenHandler;
pub use jobs::{Completion, Job};
pub use library::{Generation, LibraryEntry, LibraryStore, Promotion};
pub use manifest::{display_name, manifest_meta, parse_manifest};
pub use persistence::{FileStore, KeyValueStore, MemoryStore, PersistedState};
pub use placements::PlacementStore;
pub use region::{RegionSelection, RegionState};
pub use router::{AdjustSteps, InputRouter};
pub use snapshot::{ChooserView, GardenSnapshot, PlacementView, RecordingView};
