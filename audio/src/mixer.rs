use crate::{AudioOutput, VoiceHandle, VoiceStart};
use garden_core::{Error, SharedAudio};
use log::{debug, trace};
use spatial::{pan_mono, pan_stereo, SourceMix};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Linear parameter ramp advanced once per output frame.
#[derive(Debug, Clone, Copy)]
struct Ramp {
    current: f32,
    target: f32,
    step: f32,
    remaining: u32,
}

impl Ramp {
    fn fixed(value: f32) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.0,
            remaining: 0,
        }
    }

    fn towards(&mut self, target: f32, frames: u32) {
        self.target = target;
        if frames == 0 {
            self.current = target;
            self.remaining = 0;
        } else {
            self.step = (target - self.current) / frames as f32;
            self.remaining = frames;
        }
    }

    fn advance(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.current = if self.remaining == 0 {
                self.target
            } else {
                self.current + self.step
            };
        }
        self.current
    }

    fn is_settled(&self) -> bool {
        self.remaining == 0
    }
}

struct MixVoice {
    handle: VoiceHandle,
    buffer: SharedAudio,
    /// Fractional read position in source frames
    position: f64,
    /// Source frames consumed per output frame
    step: f64,
    gain: Ramp,
    pan: Ramp,
    releasing: bool,
}

impl MixVoice {
    fn next_frame(&mut self) -> (f32, f32) {
        let gain = self.gain.advance();
        let pan = self.pan.advance();

        let frames = self.buffer.frames();
        if frames == 0 {
            return (0.0, 0.0);
        }
        let channels = self.buffer.channels as usize;
        let index = self.position.floor() as usize % frames;
        let next = (index + 1) % frames;
        let frac = (self.position - self.position.floor()) as f32;
        let samples = &self.buffer.samples;
        let read = |channel: usize| {
            let a = samples[index * channels + channel];
            let b = samples[next * channels + channel];
            a + (b - a) * frac
        };

        let out = if channels == 1 {
            pan_mono(read(0) * gain, pan)
        } else {
            pan_stereo(read(0) * gain, read(1) * gain, pan)
        };

        self.position = (self.position + self.step) % frames as f64;
        out
    }

    fn is_finished(&self) -> bool {
        self.releasing && self.gain.is_settled() && self.gain.current == 0.0
    }
}

struct MixerState {
    sample_rate: u32,
    next_handle: u64,
    voices: Vec<MixVoice>,
}

impl MixerState {
    fn frames_for(&self, duration: Duration) -> u32 {
        (duration.as_secs_f64() * self.sample_rate as f64).round() as u32
    }

    fn voice_mut(&mut self, handle: VoiceHandle) -> Result<&mut MixVoice, Error> {
        self.voices
            .iter_mut()
            .find(|v| v.handle == handle)
            .ok_or_else(|| Error::NotFound(format!("{} is not playing", handle)))
    }

    fn render(&mut self, out: &mut [f32], channels: usize) {
        out.fill(0.0);
        if channels == 0 {
            return;
        }
        for frame in out.chunks_mut(channels) {
            let (mut left, mut right) = (0.0f32, 0.0f32);
            for voice in self.voices.iter_mut() {
                let (l, r) = voice.next_frame();
                left += l;
                right += r;
            }
            if frame.len() == 1 {
                frame[0] = (left + right) * 0.5;
            } else {
                frame[0] = left;
                frame[1] = right;
            }
        }
        let before = self.voices.len();
        self.voices.retain(|voice| !voice.is_finished());
        if self.voices.len() != before {
            trace!("Dropped {} finished voices", before - self.voices.len());
        }
    }
}

/// Snapshot of one voice inside the mixer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceLevel {
    pub handle: VoiceHandle,
    pub gain: f32,
    pub pan: f32,
    pub target_gain: f32,
    pub target_pan: f32,
    pub releasing: bool,
}

/// Software audio graph: looping voices summed into an interleaved buffer.
///
/// Clones share the same voices, so one clone can be handed to the
/// playback engine while another feeds the device callback.
#[derive(Clone)]
pub struct Mixer {
    shared: Arc<Mutex<MixerState>>,
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            shared: Arc::new(Mutex::new(MixerState {
                sample_rate: sample_rate.max(1),
                next_handle: 0,
                voices: Vec::new(),
            })),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.lock().map(|state| state.sample_rate).unwrap_or(0)
    }

    /// Fills `out` with interleaved frames of `channels` channels.
    ///
    /// Never blocks: if another thread holds the mixer, the block is silent.
    pub fn render(&self, out: &mut [f32], channels: usize) {
        match self.shared.try_lock() {
            Ok(mut state) => state.render(out, channels),
            Err(_) => out.fill(0.0),
        }
    }

    pub fn active_voices(&self) -> usize {
        self.lock().map(|state| state.voices.len()).unwrap_or(0)
    }

    pub fn levels(&self) -> Vec<VoiceLevel> {
        let Ok(state) = self.lock() else {
            return Vec::new();
        };
        state
            .voices
            .iter()
            .map(|voice| VoiceLevel {
                handle: voice.handle,
                gain: voice.gain.current,
                pan: voice.pan.current,
                target_gain: voice.gain.target,
                target_pan: voice.pan.target,
                releasing: voice.releasing,
            })
            .collect()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MixerState>, Error> {
        self.shared
            .lock()
            .map_err(|_| Error::Audio("mixer has been poisoned".to_string()))
    }
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("voices", &self.active_voices())
            .finish()
    }
}

impl AudioOutput for Mixer {
    fn start_voice(
        &mut self,
        buffer: SharedAudio,
        start: VoiceStart,
    ) -> Result<VoiceHandle, Error> {
        if buffer.is_empty() || buffer.sample_rate == 0 {
            return Err(Error::Audio("cannot loop an empty buffer".to_string()));
        }
        let mut state = self.lock()?;
        state.next_handle += 1;
        let handle = VoiceHandle(state.next_handle);

        let frames = buffer.frames() as f64;
        let offset = start.offset_seconds as f64 * buffer.sample_rate as f64;
        let position = if offset.is_finite() {
            offset.rem_euclid(frames)
        } else {
            0.0
        };
        let step = buffer.sample_rate as f64 / state.sample_rate as f64;

        debug!(
            "Mixer starting {} ({} frames, {} ch, offset {:.0})",
            handle,
            buffer.frames(),
            buffer.channels,
            position
        );
        state.voices.push(MixVoice {
            handle,
            buffer,
            position,
            step,
            gain: Ramp::fixed(0.0),
            pan: Ramp::fixed(start.pan.clamp(-1.0, 1.0)),
            releasing: false,
        });
        Ok(handle)
    }

    fn ramp(&mut self, voice: VoiceHandle, mix: SourceMix, over: Duration) -> Result<(), Error> {
        let mut state = self.lock()?;
        let frames = state.frames_for(over);
        let target = state.voice_mut(voice)?;
        if target.releasing {
            return Err(Error::InvalidState(format!("{} is releasing", voice)));
        }
        target.gain.towards(mix.gain.max(0.0), frames);
        target.pan.towards(mix.pan.clamp(-1.0, 1.0), frames);
        Ok(())
    }

    fn release(&mut self, voice: VoiceHandle, fade: Duration) -> Result<(), Error> {
        let mut state = self.lock()?;
        let frames = state.frames_for(fade);
        let target = state.voice_mut(voice)?;
        if target.releasing {
            return Err(Error::InvalidState(format!("{} already released", voice)));
        }
        target.releasing = true;
        target.gain.towards(0.0, frames);
        if frames == 0 {
            state.voices.retain(|v| v.handle != voice);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garden_core::DecodedAudio;

    fn constant(value: f32, frames: usize, channels: u16) -> SharedAudio {
        Arc::new(DecodedAudio::new(
            vec![value; frames * channels as usize],
            channels,
            100,
        ))
    }

    fn start(mixer: &mut Mixer, buffer: SharedAudio, pan: f32) -> VoiceHandle {
        mixer
            .start_voice(
                buffer,
                VoiceStart {
                    pan,
                    offset_seconds: 0.0,
                },
            )
            .unwrap()
    }

    #[test]
    fn new_voices_are_silent() {
        let mut mixer = Mixer::new(100);
        start(&mut mixer, constant(1.0, 10, 1), 0.0);

        let mut out = vec![1.0; 20];
        mixer.render(&mut out, 2);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(mixer.active_voices(), 1);
    }

    #[test]
    fn ramp_reaches_target_after_duration() {
        let mut mixer = Mixer::new(100);
        let voice = start(&mut mixer, constant(1.0, 10, 1), -1.0);
        mixer
            .ramp(
                voice,
                SourceMix {
                    gain: 1.0,
                    pan: -1.0,
                },
                Duration::from_millis(100),
            )
            .unwrap();

        // 100ms at 100Hz is 10 frames.
        let mut out = vec![0.0; 2 * 10];
        mixer.render(&mut out, 2);
        assert!(out[0] > 0.0 && out[0] < 1.0, "first frame should be mid-ramp");
        assert!((out[18] - 1.0).abs() < 1e-5, "left settles at full gain");
        assert!(out[19].abs() < 1e-5, "hard left leaves right silent");

        let level = mixer.levels()[0];
        assert_eq!(level.gain, 1.0);
        assert_eq!(level.target_gain, 1.0);
    }

    #[test]
    fn stereo_sources_keep_both_channels_at_centre() {
        let mut mixer = Mixer::new(100);
        let voice = start(&mut mixer, constant(0.5, 4, 2), 0.0);
        mixer
            .ramp(voice, SourceMix { gain: 1.0, pan: 0.0 }, Duration::ZERO)
            .unwrap();

        let mut out = vec![0.0; 8];
        mixer.render(&mut out, 2);
        for frame in out.chunks(2) {
            assert!((frame[0] - 0.5).abs() < 1e-5);
            assert!((frame[1] - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn voices_loop_over_their_buffer() {
        let mut mixer = Mixer::new(100);
        let ramp_up = Arc::new(DecodedAudio::new(vec![0.0, 1.0, 2.0, 3.0], 1, 100));
        let voice = start(&mut mixer, ramp_up, 0.0);
        mixer
            .ramp(voice, SourceMix { gain: 1.0, pan: 0.0 }, Duration::ZERO)
            .unwrap();

        let mut out = vec![0.0; 6];
        mixer.render(&mut out, 1);
        // Mono output averages the equal-power pair.
        let scale = (std::f32::consts::FRAC_PI_4.cos() + std::f32::consts::FRAC_PI_4.sin()) * 0.5;
        let expected = [0.0, 1.0, 2.0, 3.0, 0.0, 1.0];
        for (got, want) in out.iter().zip(expected) {
            assert!((got - want * scale).abs() < 1e-5, "{got} != {}", want * scale);
        }
    }

    #[test]
    fn timing_offset_sets_start_position() {
        let mut mixer = Mixer::new(100);
        let steps = Arc::new(DecodedAudio::new(vec![0.0, 1.0, 2.0, 3.0], 1, 100));
        let voice = mixer
            .start_voice(
                steps,
                VoiceStart {
                    pan: -1.0,
                    offset_seconds: -0.01,
                },
            )
            .unwrap();
        mixer
            .ramp(voice, SourceMix { gain: 1.0, pan: -1.0 }, Duration::ZERO)
            .unwrap();

        let mut out = vec![0.0; 2];
        mixer.render(&mut out, 2);
        // -10ms at 100Hz wraps to the last frame.
        assert!((out[0] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn release_fades_then_drops_the_voice() {
        let mut mixer = Mixer::new(100);
        let voice = start(&mut mixer, constant(1.0, 10, 1), 0.0);
        mixer
            .ramp(voice, SourceMix { gain: 1.0, pan: 0.0 }, Duration::ZERO)
            .unwrap();
        mixer.release(voice, Duration::from_millis(50)).unwrap();
        assert!(mixer.levels()[0].releasing);

        let mut out = vec![0.0; 2 * 5];
        mixer.render(&mut out, 2);
        assert!(out[0] > 0.0, "fade starts from the current gain");
        assert_eq!(mixer.active_voices(), 0);

        assert!(mixer.release(voice, Duration::ZERO).is_err());
        assert!(mixer
            .ramp(voice, SourceMix::SILENT, Duration::ZERO)
            .is_err());
    }

    #[test]
    fn double_release_is_an_error() {
        let mut mixer = Mixer::new(100);
        let voice = start(&mut mixer, constant(1.0, 10, 1), 0.0);
        mixer.release(voice, Duration::from_millis(50)).unwrap();
        assert!(matches!(
            mixer.release(voice, Duration::from_millis(50)),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn rejects_empty_buffers() {
        let mut mixer = Mixer::new(100);
        let empty = Arc::new(DecodedAudio::new(Vec::new(), 1, 100));
        assert!(mixer
            .start_voice(
                empty,
                VoiceStart {
                    pan: 0.0,
                    offset_seconds: 0.0
                }
            )
            .is_err());
    }
}
