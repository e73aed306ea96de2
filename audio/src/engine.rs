use crate::{AudioOutput, VoiceHandle, VoiceStart};
use garden_core::{Cell, Placement, PlacementId, PlacementParams, RecordingId, SharedAudio};
use log::{debug, info, warn};
use spatial::{centroid, mix_for, pan_from_centroid, SourceMix};
use std::collections::HashMap;
use std::time::Duration;

/// Timing and geometry the engine needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    /// Grid width used for pan mapping
    pub grid_width: u32,
    /// Length of gain/pan ramps on cursor movement
    pub ramp: Duration,
    /// Fade-out applied before a voice is stopped
    pub release: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            grid_width: 8,
            ramp: Duration::from_millis(40),
            release: Duration::from_millis(120),
        }
    }
}

/// What a reconciliation pass changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub started: usize,
    pub released: usize,
    pub updated: usize,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.started == 0 && self.released == 0 && self.updated == 0
    }
}

struct Voice {
    handle: VoiceHandle,
    recording_id: RecordingId,
    cells: Vec<Cell>,
    params: PlacementParams,
    /// Last mix sent to the output
    mix: SourceMix,
}

/// Keeps one looping voice per audible placement.
pub struct PlaybackEngine<O: AudioOutput> {
    output: O,
    config: PlaybackConfig,
    cursor: Option<Cell>,
    voices: HashMap<PlacementId, Voice>,
}

impl<O: AudioOutput> PlaybackEngine<O> {
    pub fn new(output: O, config: PlaybackConfig) -> Self {
        Self {
            output,
            config,
            cursor: None,
            voices: HashMap::new(),
        }
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn has_voice(&self, placement: PlacementId) -> bool {
        self.voices.contains_key(&placement)
    }

    /// Mix most recently applied to the placement's voice.
    pub fn mix(&self, placement: PlacementId) -> Option<SourceMix> {
        self.voices.get(&placement).map(|voice| voice.mix)
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Brings the set of voices in line with `placements`.
    ///
    /// Level-triggered: the full desired state is recomputed on every call,
    /// so repeated or redundant calls are harmless.
    pub fn reconcile<F>(&mut self, placements: &[Placement], resolve: F) -> ReconcileReport
    where
        F: Fn(&RecordingId) -> Option<SharedAudio>,
    {
        let mut report = ReconcileReport::default();

        let stale: Vec<PlacementId> = self
            .voices
            .iter()
            .filter(|(id, voice)| match placements.iter().find(|p| p.id == **id) {
                None => true,
                Some(placement) => {
                    placement.recording_id != voice.recording_id
                        || placement.params.timing_offset_seconds
                            != voice.params.timing_offset_seconds
                }
            })
            .map(|(id, _)| *id)
            .collect();

        for id in stale {
            if let Some(voice) = self.voices.remove(&id) {
                self.release_voice(id, voice);
                report.released += 1;
            }
        }

        for placement in placements {
            if placement.cells.is_empty() {
                continue;
            }

            if let Some(voice) = self.voices.get_mut(&placement.id) {
                if voice.cells != placement.cells || voice.params != placement.params {
                    voice.cells = placement.cells.clone();
                    voice.params = placement.params;
                    self.apply(placement.id);
                    report.updated += 1;
                }
                continue;
            }

            let Some(buffer) = resolve(&placement.recording_id) else {
                continue;
            };

            let pan = pan_from_centroid(centroid(&placement.cells), self.config.grid_width);
            let start = VoiceStart {
                pan,
                offset_seconds: placement.params.timing_offset_seconds,
            };
            match self.output.start_voice(buffer, start) {
                Ok(handle) => {
                    debug!("Started {} for placement {}", handle, placement.id);
                    self.voices.insert(
                        placement.id,
                        Voice {
                            handle,
                            recording_id: placement.recording_id,
                            cells: placement.cells.clone(),
                            params: placement.params,
                            mix: SourceMix { gain: 0.0, pan },
                        },
                    );
                    self.apply(placement.id);
                    report.started += 1;
                }
                Err(e) => {
                    warn!("Failed to start voice for placement {}: {}", placement.id, e);
                }
            }
        }

        if !report.is_noop() {
            debug!(
                "Reconciled voices: {} started, {} released, {} updated",
                report.started, report.released, report.updated
            );
        }
        report
    }

    /// Recomputes every voice's mix for a new cursor position.
    pub fn update_cursor(&mut self, cursor: Option<Cell>) {
        self.cursor = cursor;
        let ids: Vec<PlacementId> = self.voices.keys().copied().collect();
        for id in ids {
            self.apply(id);
        }
    }

    /// Releases every voice.
    pub fn shutdown(&mut self) {
        let voices: Vec<(PlacementId, Voice)> = self.voices.drain().collect();
        if !voices.is_empty() {
            info!("Releasing {} voices", voices.len());
        }
        for (id, voice) in voices {
            self.release_voice(id, voice);
        }
    }

    fn apply(&mut self, id: PlacementId) {
        let Some(voice) = self.voices.get_mut(&id) else {
            return;
        };
        let mix = mix_for(
            &voice.cells,
            &voice.params,
            self.cursor,
            self.config.grid_width,
        );
        if mix == voice.mix {
            return;
        }
        match self.output.ramp(voice.handle, mix, self.config.ramp) {
            Ok(()) => voice.mix = mix,
            Err(e) => warn!("Failed to ramp {}: {}", voice.handle, e),
        }
    }

    fn release_voice(&mut self, id: PlacementId, voice: Voice) {
        debug!("Releasing {} for placement {}", voice.handle, id);
        if let Err(e) = self.output.release(voice.handle, self.config.release) {
            debug!("Ignoring teardown failure for {}: {}", voice.handle, e);
        }
    }
}

impl<O: AudioOutput> Drop for PlaybackEngine<O> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockAudioOutput;
    use garden_core::{DecodedAudio, Error};
    use mockall::predicate::*;
    use std::sync::Arc;

    fn buffer() -> SharedAudio {
        Arc::new(DecodedAudio::new(vec![0.5; 64], 1, 48_000))
    }

    fn placement(cells: &[(u32, u32)], recording_id: RecordingId) -> Placement {
        Placement {
            id: PlacementId::new(),
            cells: cells.iter().map(|&(x, y)| Cell::new(x, y)).collect(),
            recording_id,
            params: PlacementParams::default(),
        }
    }

    fn config() -> PlaybackConfig {
        PlaybackConfig {
            grid_width: 8,
            ..PlaybackConfig::default()
        }
    }

    #[test_log::test]
    fn reconcile_is_idempotent() {
        let recording = RecordingId::new();
        let placements = vec![placement(&[(1, 1)], recording)];

        let mut output = MockAudioOutput::new();
        output
            .expect_start_voice()
            .times(1)
            .returning(|_, _| Ok(VoiceHandle(1)));
        output.expect_ramp().returning(|_, _, _| Ok(()));
        output.expect_release().times(1).returning(|_, _| Ok(()));

        let mut engine = PlaybackEngine::new(output, config());
        let first = engine.reconcile(&placements, |_| Some(buffer()));
        assert_eq!(first.started, 1);

        let second = engine.reconcile(&placements, |_| Some(buffer()));
        assert!(second.is_noop());
        assert_eq!(engine.voice_count(), 1);
        // Drop releases the single voice.
    }

    #[test_log::test]
    fn unresolved_recordings_get_no_voice() {
        let placements = vec![placement(&[(0, 0)], RecordingId::new())];
        let mut output = MockAudioOutput::new();
        output.expect_start_voice().never();

        let mut engine = PlaybackEngine::new(output, config());
        let report = engine.reconcile(&placements, |_| None);
        assert!(report.is_noop());
        assert_eq!(engine.voice_count(), 0);
    }

    #[test_log::test]
    fn voices_start_with_centroid_pan() {
        let recording = RecordingId::new();
        let placements = vec![placement(&[(0, 0), (0, 1)], recording)];

        let mut output = MockAudioOutput::new();
        output
            .expect_start_voice()
            .withf(|_, start| start.pan == -1.0 && start.offset_seconds == 0.0)
            .times(1)
            .returning(|_, _| Ok(VoiceHandle(7)));
        output.expect_ramp().returning(|_, _, _| Ok(()));
        output.expect_release().returning(|_, _| Ok(()));

        let mut engine = PlaybackEngine::new(output, config());
        engine.reconcile(&placements, |_| Some(buffer()));
        let mix = engine.mix(placements[0].id).unwrap();
        assert_eq!(mix.pan, -1.0);
        assert_eq!(mix.gain, 0.0);
    }

    #[test_log::test]
    fn cursor_updates_ramp_towards_new_gain() {
        let recording = RecordingId::new();
        let placements = vec![placement(&[(2, 2)], recording)];

        let mut output = MockAudioOutput::new();
        output
            .expect_start_voice()
            .returning(|_, _| Ok(VoiceHandle(3)));
        output
            .expect_ramp()
            .with(
                eq(VoiceHandle(3)),
                function(|mix: &SourceMix| mix.gain == 1.0),
                eq(Duration::from_millis(40)),
            )
            .times(1)
            .returning(|_, _, _| Ok(()));
        output.expect_release().returning(|_, _| Ok(()));

        let mut engine = PlaybackEngine::new(output, config());
        engine.reconcile(&placements, |_| Some(buffer()));
        engine.update_cursor(Some(Cell::new(2, 2)));
        assert_eq!(engine.mix(placements[0].id).unwrap().gain, 1.0);
    }

    #[test_log::test]
    fn removed_placements_are_released() {
        let recording = RecordingId::new();
        let keep = placement(&[(0, 0)], recording);
        let drop_me = placement(&[(5, 5)], recording);

        let mut output = MockAudioOutput::new();
        let mut next = 0;
        output.expect_start_voice().times(2).returning(move |_, _| {
            next += 1;
            Ok(VoiceHandle(next))
        });
        output.expect_ramp().returning(|_, _, _| Ok(()));
        output.expect_release().returning(|_, _| Ok(()));

        let mut engine = PlaybackEngine::new(output, config());
        engine.reconcile(&[keep.clone(), drop_me.clone()], |_| Some(buffer()));
        assert_eq!(engine.voice_count(), 2);

        let report = engine.reconcile(&[keep.clone()], |_| Some(buffer()));
        assert_eq!(report.released, 1);
        assert!(engine.has_voice(keep.id));
        assert!(!engine.has_voice(drop_me.id));
    }

    #[test_log::test]
    fn teardown_failures_are_swallowed() {
        let recording = RecordingId::new();
        let placements = vec![placement(&[(0, 0)], recording)];

        let mut output = MockAudioOutput::new();
        output
            .expect_start_voice()
            .returning(|_, _| Ok(VoiceHandle(1)));
        output.expect_ramp().returning(|_, _, _| Ok(()));
        output
            .expect_release()
            .returning(|_, _| Err(Error::NotFound("voice#1".to_string())));

        let mut engine = PlaybackEngine::new(output, config());
        engine.reconcile(&placements, |_| Some(buffer()));
        let report = engine.reconcile(&[], |_| Some(buffer()));
        assert_eq!(report.released, 1);
        assert_eq!(engine.voice_count(), 0);
    }

    #[test_log::test]
    fn timing_change_restarts_the_voice() {
        let recording = RecordingId::new();
        let mut moved = placement(&[(0, 0)], recording);

        let mut output = MockAudioOutput::new();
        output
            .expect_start_voice()
            .times(2)
            .returning(|_, _| Ok(VoiceHandle(1)));
        output.expect_ramp().returning(|_, _, _| Ok(()));
        output.expect_release().returning(|_, _| Ok(()));

        let mut engine = PlaybackEngine::new(output, config());
        engine.reconcile(std::slice::from_ref(&moved), |_| Some(buffer()));

        moved.params.timing_offset_seconds = 0.5;
        let report = engine.reconcile(std::slice::from_ref(&moved), |_| Some(buffer()));
        assert_eq!(report.released, 1);
        assert_eq!(report.started, 1);
    }

    #[test_log::test]
    fn volume_change_reapplies_mix() {
        let recording = RecordingId::new();
        let mut loud = placement(&[(4, 4)], recording);

        let mut output = MockAudioOutput::new();
        output
            .expect_start_voice()
            .times(1)
            .returning(|_, _| Ok(VoiceHandle(1)));
        output.expect_ramp().returning(|_, _, _| Ok(()));
        output.expect_release().returning(|_, _| Ok(()));

        let mut engine = PlaybackEngine::new(output, config());
        engine.update_cursor(Some(Cell::new(4, 4)));
        engine.reconcile(std::slice::from_ref(&loud), |_| Some(buffer()));
        assert_eq!(engine.mix(loud.id).unwrap().gain, 1.0);

        loud.params.volume = 0.25;
        let report = engine.reconcile(std::slice::from_ref(&loud), |_| Some(buffer()));
        assert_eq!(report.updated, 1);
        assert_eq!(engine.mix(loud.id).unwrap().gain, 0.25);
    }
}
