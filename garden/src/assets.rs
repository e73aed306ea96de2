//! Locator resolution: files on disk and uploads held in the store.

use crate::persistence::{upload_key, KeyValueStore, UPLOAD_LOCATOR_PREFIX};
use async_trait::async_trait;
use garden_core::{AssetSource, Error};
use log::trace;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// [`AssetSource`] over a base directory and a [`KeyValueStore`].
///
/// `upload:<digest>` locators read the stored upload payload; anything else
/// is a file path, relative paths resolving against the base directory.
pub struct StoreAssets {
    root: PathBuf,
    store: Arc<dyn KeyValueStore>,
}

impl StoreAssets {
    pub fn new<P: AsRef<Path>>(root: P, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            store,
        }
    }

    fn path_for(&self, locator: &str) -> PathBuf {
        let path = Path::new(locator);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl AssetSource for StoreAssets {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, Error> {
        if let Some(digest) = locator.strip_prefix(UPLOAD_LOCATOR_PREFIX) {
            trace!("Fetching stored upload {}", digest);
            return self
                .store
                .get(&upload_key(digest))?
                .ok_or_else(|| Error::NotFound(format!("upload payload {}", digest)));
        }

        let path = self.path_for(locator);
        trace!("Fetching {:?}", path);
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(locator.to_string())
            } else {
                Error::Io(e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reads_relative_and_absolute_paths() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sounds")).unwrap();
        std::fs::write(dir.path().join("sounds/rain.wav"), b"rain").unwrap();

        let assets = StoreAssets::new(dir.path(), Arc::new(MemoryStore::new()));
        assert_eq!(assets.fetch("sounds/rain.wav").await.unwrap(), b"rain");

        let absolute = dir.path().join("sounds/rain.wav");
        assert_eq!(
            assets.fetch(absolute.to_str().unwrap()).await.unwrap(),
            b"rain"
        );
    }

    #[test]
    fn resolves_uploads_through_the_store() {
        let store = Arc::new(MemoryStore::new());
        store.put(&upload_key("abc123"), b"payload").unwrap();
        let assets = StoreAssets::new("/nonexistent", store);

        let payload =
            tokio_test::assert_ok!(tokio_test::block_on(assets.fetch("upload:abc123")));
        assert_eq!(payload, b"payload");
        assert!(matches!(
            tokio_test::block_on(assets.fetch("upload:missing")),
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let assets = StoreAssets::new(dir.path(), Arc::new(MemoryStore::new()));
        assert!(matches!(
            assets.fetch("nope.ogg").await,
            Err(Error::NotFound(_))
        ));
    }
}
