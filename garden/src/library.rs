//! Recordings known to the garden.

use garden_core::{DecodedAudio, OriginKind, RecordingId, RecordingMeta, SharedAudio};
use log::{debug, trace};
use std::sync::Arc;

/// Identifies one incarnation of a library entry.
///
/// Decode completions carry the generation they were issued for; a
/// completion whose generation no longer matches the entry is stale.
pub type Generation = u64;

/// A recording plus its decoded buffer, once available.
#[derive(Debug, Clone)]
pub struct LibraryEntry {
    pub meta: RecordingMeta,
    pub buffer: Option<SharedAudio>,
    generation: Generation,
}

impl LibraryEntry {
    pub fn id(&self) -> RecordingId {
        self.meta.id
    }

    pub fn is_resolved(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// What happened to a decode result handed to [`LibraryStore::promote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    /// The entry gained its buffer.
    Resolved,
    /// The entry was removed or replaced since the decode was issued.
    Stale,
}

/// Recordings deduplicated by id and by `(name, origin)`.
#[derive(Debug, Default)]
pub struct LibraryStore {
    entries: Vec<LibraryEntry>,
    next_generation: Generation,
}

impl LibraryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    pub fn get(&self, id: RecordingId) -> Option<&LibraryEntry> {
        self.entries.iter().find(|entry| entry.meta.id == id)
    }

    pub fn contains(&self, id: RecordingId) -> bool {
        self.get(id).is_some()
    }

    /// Decoded buffer for `id`, if the entry exists and has resolved.
    pub fn buffer(&self, id: &RecordingId) -> Option<SharedAudio> {
        self.get(*id).and_then(|entry| entry.buffer.clone())
    }

    /// Whether a new entry with `meta` would duplicate an existing one.
    pub fn is_duplicate(&self, meta: &RecordingMeta) -> bool {
        self.entries.iter().any(|entry| {
            entry.meta.id == meta.id
                || (entry.meta.origin == meta.origin && entry.meta.name == meta.name)
        })
    }

    /// Adds a metadata-only entry.
    ///
    /// Returns the new entry's generation, or `None` when it duplicates an
    /// existing entry.
    pub fn insert_pending(&mut self, meta: RecordingMeta) -> Option<Generation> {
        self.insert(meta, None)
    }

    /// Adds an entry that already has its buffer.
    pub fn insert_resolved(&mut self, meta: RecordingMeta, audio: DecodedAudio) -> bool {
        self.insert(meta, Some(Arc::new(audio))).is_some()
    }

    fn insert(&mut self, meta: RecordingMeta, buffer: Option<SharedAudio>) -> Option<Generation> {
        if self.is_duplicate(&meta) {
            trace!("Skipping duplicate recording '{}' ({})", meta.name, meta.id);
            return None;
        }
        self.next_generation += 1;
        let generation = self.next_generation;
        debug!(
            "Library added '{}' ({}, {:?}, {})",
            meta.name,
            meta.id,
            meta.origin,
            if buffer.is_some() { "decoded" } else { "pending" }
        );
        self.entries.push(LibraryEntry {
            meta,
            buffer,
            generation,
        });
        Some(generation)
    }

    /// Attaches a decoded buffer to the entry it was issued for.
    pub fn promote(
        &mut self,
        id: RecordingId,
        generation: Generation,
        audio: DecodedAudio,
    ) -> Promotion {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.meta.id == id && entry.generation == generation)
        {
            Some(entry) => {
                debug!("Library resolved '{}' ({})", entry.meta.name, id);
                entry.buffer = Some(Arc::new(audio));
                Promotion::Resolved
            }
            None => {
                debug!("Dropping stale decode for {} (generation {})", id, generation);
                Promotion::Stale
            }
        }
    }

    /// Whether `generation` is still the live incarnation of `id`.
    pub fn is_current(&self, id: RecordingId, generation: Generation) -> bool {
        self.get(id)
            .map(|entry| entry.generation == generation)
            .unwrap_or(false)
    }

    /// Re-adds persisted entries.
    ///
    /// Manifest-owned entries are skipped, since the live manifest
    /// re-creates them. Returns the entries that need decoding.
    pub fn rehydrate(
        &mut self,
        persisted: Vec<RecordingMeta>,
    ) -> Vec<(RecordingMeta, Generation)> {
        let mut pending = Vec::new();
        for meta in persisted {
            if meta.origin == OriginKind::Public {
                trace!("Not rehydrating manifest-owned '{}'", meta.name);
                continue;
            }
            if let Some(generation) = self.insert_pending(meta.clone()) {
                pending.push((meta, generation));
            }
        }
        pending
    }

    pub fn remove(&mut self, id: RecordingId) -> Option<LibraryEntry> {
        let index = self.entries.iter().position(|entry| entry.meta.id == id)?;
        let entry = self.entries.remove(index);
        debug!("Library removed '{}' ({})", entry.meta.name, id);
        Some(entry)
    }

    /// Metadata of every entry, in insertion order.
    pub fn metas(&self) -> Vec<RecordingMeta> {
        self.entries.iter().map(|entry| entry.meta.clone()).collect()
    }
}
