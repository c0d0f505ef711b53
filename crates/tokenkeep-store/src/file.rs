//! JSON file backend.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{StorageBackend, StoreError};

/// A [`StorageBackend`] persisted as one JSON object in a file.
///
/// ```json
/// { "accessToken": "eyJ...", "refreshToken": "eyJ..." }
/// ```
///
/// Every operation reads the file fresh, so the latest value on disk
/// always wins. Writes go to a sibling temp file first and are then
/// renamed into place, so a crash mid-write leaves the old contents.
/// A missing file reads as an empty store.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Uses the file at `path`. Nothing is touched until the first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Where the store lives on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", self.path.display())))
    }

    /// `<file name>.tmp` next to the target. Appending rather than
    /// swapping the extension keeps it distinct from a target that already
    /// ends in `.tmp`.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(map)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(StoreError::Io)?;
        }

        let tmp = self.temp_path();
        std::fs::write(&tmp, json).map_err(StoreError::Io)?;
        std::fs::rename(&tmp, &self.path).map_err(StoreError::Io)?;
        tracing::trace!(path = %self.path.display(), keys = map.len(), "storage written");
        Ok(())
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.read_map()?;
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.write_map(&map)
    }
}
