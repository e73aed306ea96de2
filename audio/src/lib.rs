//! Audio subsystem for the sound garden
//!
//! This crate turns placements into looping voices. The [`PlaybackEngine`]
//! reconciles voices against the placement and library stores and keeps
//! their gain and pan in step with the cursor; an [`AudioOutput`] carries
//! those decisions into an actual audio graph. [`Mixer`] is the software
//! graph used by the terminal front-end and by tests.

use garden_core::{Error, SharedAudio};
use spatial::SourceMix;
use std::time::Duration;

mod engine;
mod mixer;

pub use engine::{PlaybackConfig, PlaybackEngine, ReconcileReport};
pub use mixer::{Mixer, VoiceLevel};

/// Opaque handle to a voice living in an [`AudioOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceHandle(pub u64);

impl std::fmt::Display for VoiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// Initial state of a new voice. Voices always start silent and looping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceStart {
    pub pan: f32,
    /// Offset into the loop, in seconds. Negative offsets wrap from the end.
    pub offset_seconds: f32,
}

/// The audio graph: looping sources, each chained through a gain stage and
/// a stereo-position stage into the output.
#[cfg_attr(test, mockall::automock)]
pub trait AudioOutput: Send {
    /// Starts a looping voice at zero gain.
    fn start_voice(&mut self, buffer: SharedAudio, start: VoiceStart)
        -> Result<VoiceHandle, Error>;

    /// Moves gain and pan linearly towards `mix` over `over`.
    fn ramp(&mut self, voice: VoiceHandle, mix: SourceMix, over: Duration) -> Result<(), Error>;

    /// Fades the voice to silence over `fade`, then stops and disconnects it.
    fn release(&mut self, voice: VoiceHandle, fade: Duration) -> Result<(), Error>;
}

impl<T: AudioOutput + ?Sized> AudioOutput for Box<T> {
    fn start_voice(
        &mut self,
        buffer: SharedAudio,
        start: VoiceStart,
    ) -> Result<VoiceHandle, Error> {
        (**self).start_voice(buffer, start)
    }

    fn ramp(&mut self, voice: VoiceHandle, mix: SourceMix, over: Duration) -> Result<(), Error> {
        (**self).ramp(voice, mix, over)
    }

    fn release(&mut self, voice: VoiceHandle, fade: Duration) -> Result<(), Error> {
        (**self).release(voice, fade)
    }
}
