use crate::{Cell, PlacementId, RecordingId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where a recording came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginKind {
    /// Catalog entry owned by the manifest.
    Public,
    /// Payload supplied by the user.
    Upload,
}

/// Persisted library record. Buffers are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingMeta {
    pub id: RecordingId,
    pub name: String,
    #[serde(rename = "sourceLocator")]
    pub locator: String,
    #[serde(rename = "originKind")]
    pub origin: OriginKind,
}

/// Interleaved PCM produced by a [`crate::Decoder`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// Playback parameters of a placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementParams {
    /// Gain at the placement's own cells. Never negative.
    pub volume: f32,
    /// Distance in cells beyond which the placement is silent. Always positive.
    pub radius: f32,
    /// Start offset into the loop, in seconds. Negative values wrap from the end.
    #[serde(rename = "timing", default)]
    pub timing_offset_seconds: f32,
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self {
            volume: 1.0,
            radius: 3.0,
            timing_offset_seconds: 0.0,
        }
    }
}

impl PlacementParams {
    /// Applies `update` on top of these params, ignoring out-of-range values.
    pub fn merged(mut self, update: &ParamsUpdate) -> Self {
        if let Some(volume) = update.volume.filter(|v| v.is_finite()) {
            self.volume = volume.max(0.0);
        }
        if let Some(radius) = update.radius.filter(|r| r.is_finite() && *r > 0.0) {
            self.radius = radius;
        }
        if let Some(offset) = update.timing_offset_seconds.filter(|t| t.is_finite()) {
            self.timing_offset_seconds = offset;
        }
        self
    }
}

/// Partial parameter change; `None` leaves a field untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParamsUpdate {
    pub volume: Option<f32>,
    pub radius: Option<f32>,
    pub timing_offset_seconds: Option<f32>,
}

impl ParamsUpdate {
    pub fn volume(volume: f32) -> Self {
        Self {
            volume: Some(volume),
            ..Self::default()
        }
    }

    pub fn radius(radius: f32) -> Self {
        Self {
            radius: Some(radius),
            ..Self::default()
        }
    }

    pub fn timing(offset_seconds: f32) -> Self {
        Self {
            timing_offset_seconds: Some(offset_seconds),
            ..Self::default()
        }
    }
}

/// A recording bound to one or more grid cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub id: PlacementId,
    pub cells: Vec<Cell>,
    #[serde(rename = "recordingId")]
    pub recording_id: RecordingId,
    pub params: PlacementParams,
}

impl Placement {
    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }
}
