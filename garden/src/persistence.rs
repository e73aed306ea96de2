//! Durable storage for library metadata, placements and upload payloads.

use garden_core::{Error, Placement, RecordingMeta};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

pub const LIBRARY_KEY: &str = "library";
pub const PLACEMENTS_KEY: &str = "placements";

/// Locator prefix for recordings whose bytes live in the store.
pub const UPLOAD_LOCATOR_PREFIX: &str = "upload:";

/// Store key holding the payload of the upload with `digest`.
pub fn upload_key(digest: &str) -> String {
    format!("upload/{}", digest)
}

/// Opaque byte store keyed by string.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;
    fn put(&self, key: &str, value: &[u8]) -> Result<(), Error>;
    fn remove(&self, key: &str) -> Result<(), Error>;
}

/// One file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, Error> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !valid {
            return Err(Error::Persistence(format!("invalid store key `{}`", key)));
        }
        Ok(self.root.join(relative))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Persistence(format!(
                "Failed to read {:?}: {}",
                path, e
            ))),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Persistence(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }
        fs::write(&path, value)
            .map_err(|e| Error::Persistence(format!("Failed to write {:?}: {}", path, e)))
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Persistence(format!(
                "Failed to remove {:?}: {}",
                path, e
            ))),
        }
    }
}

/// In-memory store, for tests and for running without a data directory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        match self.values.lock() {
            Ok(values) => {
                let mut keys: Vec<String> = values.keys().cloned().collect();
                keys.sort();
                keys
            }
            Err(_) => Vec::new(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let values = self
            .values
            .lock()
            .map_err(|_| Error::Persistence("memory store poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| Error::Persistence("memory store poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| Error::Persistence("memory store poisoned".to_string()))?;
        values.remove(key);
        Ok(())
    }
}

/// State read back at startup.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PersistedState {
    pub library: Vec<RecordingMeta>,
    pub placements: Vec<Placement>,
}

/// Reads persisted state. Missing or unreadable records come back empty.
pub fn load_state(store: &dyn KeyValueStore) -> PersistedState {
    PersistedState {
        library: load_record(store, LIBRARY_KEY),
        placements: load_record(store, PLACEMENTS_KEY),
    }
}

fn load_record<T: serde::de::DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Vec<T> {
    let bytes = match store.get(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("Failed to read persisted {}: {}", key, e);
            return Vec::new();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(values) => values,
        Err(e) => {
            warn!("Ignoring corrupt persisted {}: {}", key, e);
            Vec::new()
        }
    }
}

pub fn save_library(store: &dyn KeyValueStore, library: &[RecordingMeta]) -> Result<(), Error> {
    save_record(store, LIBRARY_KEY, library)
}

pub fn save_placements(store: &dyn KeyValueStore, placements: &[Placement]) -> Result<(), Error> {
    save_record(store, PLACEMENTS_KEY, placements)
}

fn save_record<T: serde::Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    values: &[T],
) -> Result<(), Error> {
    let bytes = serde_json::to_vec(values)
        .map_err(|e| Error::Serialization(format!("Failed to encode {}: {}", key, e)))?;
    store.put(key, &bytes)?;
    debug!("Persisted {} ({} records)", key, values.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use garden_core::{Cell, OriginKind, PlacementId, PlacementParams, RecordingId};
    use tempfile::tempdir;

    fn sample_state() -> PersistedState {
        let meta = RecordingMeta {
            id: RecordingId::for_locator("upload:abc"),
            name: "voice".to_string(),
            locator: "upload:abc".to_string(),
            origin: OriginKind::Upload,
        };
        let placement = Placement {
            id: PlacementId::new(),
            cells: vec![Cell::new(2, 0), Cell::new(3, 0)],
            recording_id: meta.id,
            params: PlacementParams {
                volume: 0.7,
                radius: 4.0,
                timing_offset_seconds: 1.5,
            },
        };
        PersistedState {
            library: vec![meta],
            placements: vec![placement],
        }
    }

    #[test]
    fn file_store_round_trips_state() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let state = sample_state();

        save_library(&store, &state.library).unwrap();
        save_placements(&store, &state.placements).unwrap();
        assert!(dir.path().join(LIBRARY_KEY).exists());

        assert_eq!(load_state(&store), state);
    }

    #[test]
    fn file_store_nests_upload_payloads() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.put(&upload_key("deadbeef"), b"RIFF").unwrap();
        assert!(dir.path().join("upload").join("deadbeef").exists());
        assert_eq!(
            store.get(&upload_key("deadbeef")).unwrap(),
            Some(b"RIFF".to_vec())
        );

        store.remove(&upload_key("deadbeef")).unwrap();
        store.remove(&upload_key("deadbeef")).unwrap();
        assert_eq!(store.get(&upload_key("deadbeef")).unwrap(), None);
    }

    #[test]
    fn file_store_rejects_escaping_keys() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.put("../outside", b"x").is_err());
        assert!(store.put("/etc/passwd", b"x").is_err());
        assert!(store.get("").is_err());
    }

    #[test]
    fn missing_and_corrupt_records_load_empty() {
        let store = MemoryStore::new();
        assert_eq!(load_state(&store), PersistedState::default());

        store.put(PLACEMENTS_KEY, b"{not json").unwrap();
        assert!(load_state(&store).placements.is_empty());
    }

    #[test]
    fn read_failures_load_empty() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .returning(|_| Err(Error::Persistence("disk on fire".to_string())));
        assert_eq!(load_state(&store), PersistedState::default());
    }

    #[test]
    fn memory_store_lists_keys() {
        let store = MemoryStore::new();
        store.put("b", b"2").unwrap();
        store.put("a", b"1").unwrap();
        assert_eq!(store.keys(), vec!["a".to_string(), "b".to_string()]);
        store.remove("a").unwrap();
        assert_eq!(store.keys(), vec!["b".to_string()]);
    }
}
