//! The garden's state machine.
//!
//! [`GardenController`] owns the cursor, region, chooser, both stores and
//! the playback engine. Every change goes through one of its transition
//! methods, which persist what changed before returning. The engine is
//! reconciled whenever a transition raises an event touching the placement
//! or library store. Slow work (fetching, decoding) is queued as [`Job`]s and
//! re-enters through [`GardenController::complete`].

use crate::chooser::Chooser;
use crate::jobs::{Completion, Job};
use crate::library::{LibraryStore, Promotion};
use crate::manifest::manifest_meta;
use crate::persistence::{
    load_state, save_library, save_placements, upload_key, KeyValueStore, UPLOAD_LOCATOR_PREFIX,
};
use crate::placements::PlacementStore;
use crate::region::RegionSelection;
use crate::router::{AdjustSteps, InputRouter};
use crate::snapshot::{ChooserView, GardenSnapshot, PlacementView, RecordingView};
use audio::{AudioOutput, PlaybackConfig, PlaybackEngine, ReconcileReport};
use garden_core::{
    Action, Cell, DecodedAudio, Direction, GardenEvent, Grid, KeyBindings, KeyInput, OriginKind,
    ParamsUpdate, PlacementId, PlacementParams, RecordingId, RecordingMeta,
};
use log::{debug, info, trace, warn};
use sha2::{Digest, Sha256};
use spatial::{mix_for, SourceMix};
use std::sync::Arc;

/// Everything the controller needs to know up front.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub grid: Grid,
    /// Params of newly created placements
    pub defaults: PlacementParams,
    pub playback: PlaybackConfig,
    pub bindings: KeyBindings,
    pub steps: AdjustSteps,
}

impl ControllerConfig {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            defaults: PlacementParams::default(),
            playback: PlaybackConfig::default(),
            bindings: KeyBindings::default(),
            steps: AdjustSteps::default(),
        }
    }
}

pub struct GardenController<O: AudioOutput> {
    grid: Grid,
    cursor: Option<Cell>,
    region: RegionSelection,
    chooser: Option<Chooser>,
    library: LibraryStore,
    placements: PlacementStore,
    engine: PlaybackEngine<O>,
    router: InputRouter,
    store: Arc<dyn KeyValueStore>,
    jobs: Vec<Job>,
    events: Vec<GardenEvent>,
    /// Events already looked at by `settle`
    settled: usize,
    status: Option<String>,
}

impl<O: AudioOutput> GardenController<O> {
    pub fn new(config: ControllerConfig, output: O, store: Arc<dyn KeyValueStore>) -> Self {
        let playback = PlaybackConfig {
            grid_width: config.grid.cols(),
            ..config.playback
        };
        Self {
            grid: config.grid,
            cursor: None,
            region: RegionSelection::new(),
            chooser: None,
            library: LibraryStore::new(),
            placements: PlacementStore::new(config.defaults),
            engine: PlaybackEngine::new(output, playback),
            router: InputRouter::new(config.bindings, config.steps),
            store,
            jobs: Vec::new(),
            events: Vec::new(),
            settled: 0,
            status: None,
        }
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn cursor(&self) -> Option<Cell> {
        self.cursor
    }

    pub fn region(&self) -> &RegionSelection {
        &self.region
    }

    pub fn chooser(&self) -> Option<&Chooser> {
        self.chooser.as_ref()
    }

    pub fn library(&self) -> &LibraryStore {
        &self.library
    }

    pub fn placements(&self) -> &PlacementStore {
        &self.placements
    }

    pub fn engine(&self) -> &PlaybackEngine<O> {
        &self.engine
    }

    /// Latest user-facing message.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Work queued since the last call.
    pub fn take_jobs(&mut self) -> Vec<Job> {
        std::mem::take(&mut self.jobs)
    }

    /// Events raised since the last call.
    pub fn drain_events(&mut self) -> Vec<GardenEvent> {
        self.settled = 0;
        std::mem::take(&mut self.events)
    }

    /// Reads persisted state back in. Called once, before the manifest is
    /// ingested.
    pub fn restore(&mut self) {
        let state = load_state(self.store.as_ref());

        for (meta, generation) in self.library.rehydrate(state.library) {
            self.events.push(GardenEvent::RecordingAdded(meta.id));
            self.jobs.push(Job::Decode {
                id: meta.id,
                generation,
                locator: meta.locator,
            });
        }

        let grid = self.grid;
        let (inside, outside): (Vec<_>, Vec<_>) = state
            .placements
            .into_iter()
            .partition(|p| p.cells.iter().all(|cell| grid.contains(*cell)));
        if !outside.is_empty() {
            warn!(
                "Dropping {} persisted placements outside the {}x{} grid",
                outside.len(),
                grid.cols(),
                grid.rows()
            );
        }
        self.placements.restore(inside);
        for placement in self.placements.all() {
            self.events.push(GardenEvent::PlacementAdded(placement.id));
        }

        info!(
            "Restored {} recordings and {} placements",
            self.library.len(),
            self.placements.len()
        );
        self.settle();
    }

    /// Queues a fetch of the catalog at `locator`.
    pub fn load_manifest(&mut self, locator: impl Into<String>) {
        self.jobs.push(Job::FetchManifest {
            locator: locator.into(),
        });
    }

    /// Adds catalog recordings as metadata-only entries and queues their
    /// decodes.
    pub fn ingest_manifest(&mut self, locators: Vec<String>) {
        let mut added = 0;
        for locator in locators {
            let meta = manifest_meta(&locator);
            let id = meta.id;
            if let Some(generation) = self.library.insert_pending(meta) {
                self.events.push(GardenEvent::RecordingAdded(id));
                self.jobs.push(Job::Decode {
                    id,
                    generation,
                    locator,
                });
                added += 1;
            }
        }
        if added > 0 {
            info!("Manifest added {} recordings", added);
            self.persist_library();
            self.settle();
        }
    }

    /// Starts ingesting a user upload. Duplicates of an existing entry, by
    /// name or by content, are dropped without a message.
    pub fn upload(&mut self, name: impl Into<String>, payload: Vec<u8>) {
        let name = name.into();
        let digest = format!("{:x}", Sha256::digest(&payload));
        if self.library.is_duplicate(&upload_meta(&name, &digest)) {
            debug!("Ignoring duplicate upload '{}'", name);
            return;
        }
        self.jobs.push(Job::DecodeUpload {
            name,
            digest,
            payload,
        });
    }

    /// Applies the result of a finished [`Job`].
    pub fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::Manifest { locator, result } => match result {
                Ok(locators) => {
                    debug!("Manifest {} lists {} recordings", locator, locators.len());
                    self.ingest_manifest(locators);
                }
                Err(e) => warn!("Manifest {} unavailable, catalog is empty: {}", locator, e),
            },
            Completion::Decoded {
                id,
                generation,
                result,
            } => match result {
                Ok(audio) => {
                    if self.library.promote(id, generation, audio) == Promotion::Resolved {
                        self.events.push(GardenEvent::RecordingResolved(id));
                        self.settle();
                    }
                }
                Err(e) => {
                    if self.library.is_current(id, generation) {
                        warn!("Recording {} stays silent: {}", id, e);
                    }
                }
            },
            Completion::Upload {
                name,
                digest,
                payload,
                result,
            } => match result {
                Ok(audio) => self.accept_upload(name, digest, payload, audio),
                Err(e) => {
                    warn!("Upload '{}' failed to decode: {}", name, e);
                    self.notify(format!("Could not decode '{}': {}", name, e));
                }
            },
        }
    }

    fn accept_upload(
        &mut self,
        name: String,
        digest: String,
        payload: Vec<u8>,
        audio: DecodedAudio,
    ) {
        let meta = upload_meta(&name, &digest);
        let id = meta.id;
        if !self.library.insert_resolved(meta, audio) {
            debug!("Upload '{}' duplicated while decoding", name);
            return;
        }
        if let Err(e) = self.store.put(&upload_key(&digest), &payload) {
            warn!("Failed to store payload of '{}': {}", name, e);
        }
        self.events.push(GardenEvent::RecordingAdded(id));
        self.events.push(GardenEvent::RecordingResolved(id));
        self.persist_library();
        self.notify(format!("Added '{}'", name));
        self.settle();
    }

    pub fn handle_key(&mut self, input: KeyInput) {
        match self.router.route(input, self.chooser.is_some()) {
            Some(action) => self.perform(action),
            None => trace!("Unbound key {:?}", input),
        }
    }

    pub fn perform(&mut self, action: Action) {
        trace!("Performing {:?}", action);
        match action {
            Action::Move { direction, extend } => self.move_cursor(direction, extend),
            Action::DeleteAtCursor => {
                if let Some(id) = self.placement_at_cursor() {
                    self.remove_placement(id);
                }
            }
            Action::OpenChooser(seed) => {
                match self.chooser.as_mut() {
                    Some(chooser) => chooser.push(seed),
                    None => self.chooser = Some(Chooser::open(seed)),
                }
                self.events.push(GardenEvent::ChooserChanged);
            }
            Action::ChooserInput(c) => self.edit_chooser(|chooser, _| chooser.push(c)),
            Action::ChooserErase => self.edit_chooser(|chooser, _| chooser.erase()),
            Action::ChooserUp => self.edit_chooser(|chooser, _| chooser.select_previous()),
            Action::ChooserDown => {
                self.edit_chooser(|chooser, library| chooser.select_next(library))
            }
            Action::ChooserConfirm => {
                let selection = self
                    .chooser
                    .as_ref()
                    .and_then(|chooser| chooser.selection(&self.library));
                if let Some(recording_id) = selection {
                    self.close_chooser();
                    self.choose(recording_id);
                }
            }
            Action::RemoveSelectedRecording => {
                let selection = self
                    .chooser
                    .as_ref()
                    .and_then(|chooser| chooser.selection(&self.library));
                if let Some(recording_id) = selection {
                    self.remove_recording(recording_id);
                }
            }
            Action::AdjustVolume(delta) => {
                self.adjust_at_cursor(|params| ParamsUpdate::volume(params.volume + delta))
            }
            Action::AdjustRadius(delta) => {
                self.adjust_at_cursor(|params| ParamsUpdate::radius(params.radius + delta))
            }
            Action::AdjustTiming(delta) => self.adjust_at_cursor(|params| {
                ParamsUpdate::timing(params.timing_offset_seconds + delta)
            }),
            Action::Cancel => {
                self.close_chooser();
                if self.region.clear() {
                    self.events.push(GardenEvent::RegionChanged);
                }
            }
        }
    }

    fn move_cursor(&mut self, direction: Direction, extend: bool) {
        let Some(cursor) = self.cursor else {
            self.set_cursor(self.grid.initial_cursor());
            return;
        };
        let next = self.grid.step(cursor, direction);
        if extend {
            self.region.extend(cursor, next);
            self.events.push(GardenEvent::RegionChanged);
        } else if self.region.clear() {
            self.events.push(GardenEvent::RegionChanged);
        }
        self.set_cursor(next);
    }

    fn set_cursor(&mut self, cell: Cell) {
        if self.cursor == Some(cell) {
            return;
        }
        self.cursor = Some(cell);
        self.events.push(GardenEvent::CursorMoved(self.cursor));
        self.engine.update_cursor(self.cursor);
    }

    fn edit_chooser<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut Chooser, &LibraryStore),
    {
        if let Some(chooser) = self.chooser.as_mut() {
            edit(chooser, &self.library);
            self.events.push(GardenEvent::ChooserChanged);
        }
    }

    fn close_chooser(&mut self) {
        if self.chooser.take().is_some() {
            self.events.push(GardenEvent::ChooserChanged);
        }
    }

    fn placement_at_cursor(&self) -> Option<PlacementId> {
        let cursor = self.cursor?;
        self.placements.find_containing(cursor).map(|p| p.id)
    }

    fn adjust_at_cursor<F>(&mut self, update: F)
    where
        F: FnOnce(&PlacementParams) -> ParamsUpdate,
    {
        let Some(id) = self.placement_at_cursor() else {
            return;
        };
        let Some(params) = self.placements.get(id).map(|p| p.params) else {
            return;
        };
        self.update_params(id, &update(&params));
    }

    /// Binds `recording_id` to the region being built, or to the cursor
    /// cell when no region is being built.
    ///
    /// Does nothing while the cursor is unset.
    pub fn choose(&mut self, recording_id: RecordingId) -> Option<PlacementId> {
        if self.region.is_building() {
            let cells = self.region.take();
            self.events.push(GardenEvent::RegionChanged);
            return self.create_placement(cells, recording_id, &ParamsUpdate::default());
        }
        match self.cursor {
            Some(cursor) => {
                self.create_placement(vec![cursor], recording_id, &ParamsUpdate::default())
            }
            None => {
                debug!("No cursor yet, ignoring choice of {}", recording_id);
                None
            }
        }
    }

    pub fn create_placement(
        &mut self,
        cells: Vec<Cell>,
        recording_id: RecordingId,
        overrides: &ParamsUpdate,
    ) -> Option<PlacementId> {
        if let Some(cell) = cells.iter().find(|cell| !self.grid.contains(**cell)) {
            warn!("Refusing placement with cell {} outside the grid", cell);
            return None;
        }
        let id = self.placements.create(cells, recording_id, overrides)?;
        self.events.push(GardenEvent::PlacementAdded(id));
        self.persist_placements();
        self.settle();
        Some(id)
    }

    pub fn remove_placement(&mut self, id: PlacementId) -> bool {
        if self.placements.remove(id).is_none() {
            return false;
        }
        self.events.push(GardenEvent::PlacementRemoved(id));
        self.persist_placements();
        self.settle();
        true
    }

    pub fn update_params(&mut self, id: PlacementId, update: &ParamsUpdate) -> bool {
        let before = match self.placements.get(id) {
            Some(placement) => placement.params,
            None => return false,
        };
        match self.placements.update_params(id, update) {
            Ok(after) if after != before => {
                self.events.push(GardenEvent::PlacementUpdated(id));
                self.persist_placements();
                self.settle();
                true
            }
            Ok(_) => false,
            Err(e) => {
                debug!("Param update skipped: {}", e);
                false
            }
        }
    }

    /// Deletes a recording along with every placement bound to it.
    pub fn remove_recording(&mut self, recording_id: RecordingId) -> bool {
        let Some(entry) = self.library.remove(recording_id) else {
            return false;
        };
        self.events.push(GardenEvent::RecordingRemoved(recording_id));

        let removed = self.placements.remove_by_recording(recording_id);
        for id in &removed {
            self.events.push(GardenEvent::PlacementRemoved(*id));
        }

        if entry.meta.origin == OriginKind::Upload {
            if let Some(digest) = entry.meta.locator.strip_prefix(UPLOAD_LOCATOR_PREFIX) {
                if let Err(e) = self.store.remove(&upload_key(digest)) {
                    warn!("Failed to drop payload of '{}': {}", entry.meta.name, e);
                }
            }
        }

        self.persist_library();
        if !removed.is_empty() {
            self.persist_placements();
        }
        if let Some(chooser) = self.chooser.as_mut() {
            chooser.clamp(&self.library);
            self.events.push(GardenEvent::ChooserChanged);
        }
        self.settle();
        true
    }

    /// Brings voices in line with the stores. Safe to call at any time.
    pub fn reconcile(&mut self) -> ReconcileReport {
        let library = &self.library;
        self.engine
            .reconcile(self.placements.all(), |id| library.buffer(id))
    }

    /// Reconciles when an event raised since the last call changed the
    /// placement or library store.
    fn settle(&mut self) {
        let stores_changed = self.events[self.settled..]
            .iter()
            .any(|event| event.touches_placements() || event.touches_library());
        self.settled = self.events.len();
        if stores_changed {
            self.reconcile();
        }
    }

    /// Releases every voice.
    pub fn shutdown(&mut self) {
        self.engine.shutdown();
    }

    fn notify(&mut self, message: String) {
        info!("{}", message);
        self.status = Some(message.clone());
        self.events.push(GardenEvent::Notice(message));
    }

    fn persist_library(&self) {
        if let Err(e) = save_library(self.store.as_ref(), &self.library.metas()) {
            warn!("Library not persisted: {}", e);
        }
    }

    fn persist_placements(&self) {
        if let Err(e) = save_placements(self.store.as_ref(), self.placements.all()) {
            warn!("Placements not persisted: {}", e);
        }
    }

    pub fn snapshot(&self) -> GardenSnapshot {
        let width = self.grid.cols();
        let placements = self
            .placements
            .all()
            .iter()
            .map(|placement| {
                let playing = self.engine.has_voice(placement.id);
                let mix = if playing {
                    mix_for(&placement.cells, &placement.params, self.cursor, width)
                } else {
                    SourceMix::SILENT
                };
                PlacementView {
                    id: placement.id,
                    cells: placement.cells.clone(),
                    recording_id: placement.recording_id,
                    recording_name: self
                        .library
                        .get(placement.recording_id)
                        .map(|entry| entry.meta.name.clone()),
                    params: placement.params,
                    playing,
                    gain: mix.gain,
                    pan: mix.pan,
                }
            })
            .collect();

        let recordings = self
            .library
            .entries()
            .iter()
            .map(|entry| RecordingView {
                id: entry.meta.id,
                name: entry.meta.name.clone(),
                origin: entry.meta.origin,
                resolved: entry.is_resolved(),
            })
            .collect();

        let chooser = self.chooser.as_ref().map(|chooser| ChooserView {
            query: chooser.query().to_string(),
            matches: chooser
                .matches(&self.library)
                .into_iter()
                .map(|entry| RecordingView {
                    id: entry.meta.id,
                    name: entry.meta.name.clone(),
                    origin: entry.meta.origin,
                    resolved: entry.is_resolved(),
                })
                .collect(),
            selected: chooser.selected_index(),
        });

        GardenSnapshot {
            cols: self.grid.cols(),
            rows: self.grid.rows(),
            cursor: self.cursor,
            region: self.region.cells().to_vec(),
            placements,
            recordings,
            chooser,
            status: self.status.clone(),
        }
    }
}

fn upload_meta(name: &str, digest: &str) -> RecordingMeta {
    let locator = format!("{}{}", UPLOAD_LOCATOR_PREFIX, digest);
    RecordingMeta {
        id: RecordingId::for_locator(&locator),
        name: name.to_string(),
        locator,
        origin: OriginKind::Upload,
    }
}
