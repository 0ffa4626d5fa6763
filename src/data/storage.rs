//! Persistence backends for the import history. A backend holds one serialized
//! collection under a single fixed key and knows nothing about dedup rules.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::data::dataset::Dataset;

pub const DEFAULT_HISTORY_KEY: &str = "usage_history";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to read history from {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to write history to {path}: {source}")]
    Write { path: String, source: io::Error },
    #[error("failed to encode history: {0}")]
    Serialize(serde_json::Error),
    #[error("stored history is corrupt: {0}")]
    Deserialize(serde_json::Error),
}

pub trait HistoryBackend: Send {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<Vec<Dataset>>, StorageError>;
    fn save(&self, datasets: &[Dataset]) -> Result<(), StorageError>;
    /// Drop the stored collection entirely.
    fn clear(&self) -> Result<(), StorageError>;
}

pub fn encode(datasets: &[Dataset]) -> Result<String, StorageError> {
    serde_json::to_string_pretty(datasets).map_err(StorageError::Serialize)
}

pub fn decode(raw: &str) -> Result<Vec<Dataset>, StorageError> {
    serde_json::from_str(raw).map_err(StorageError::Deserialize)
}

/// JSON file at `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{key}.json")),
        }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir, DEFAULT_HISTORY_KEY)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn write_error(&self, source: io::Error) -> StorageError {
        StorageError::Write {
            path: self.display_path(),
            source,
        }
    }
}

impl HistoryBackend for FileBackend {
    fn load(&self) -> Result<Option<Vec<Dataset>>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.display_path(),
                    source,
                })
            }
        };
        decode(&raw).map(Some)
    }

    fn save(&self, datasets: &[Dataset]) -> Result<(), StorageError> {
        let serialized = encode(datasets)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| self.write_error(err))?;
        }
        // Write beside the target and rename so a crash never leaves half a file.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serialized).map_err(|err| self.write_error(err))?;
        fs::rename(&staging, &self.path).map_err(|err| self.write_error(err))
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.write_error(err)),
        }
    }
}

/// In-process backend holding the serialized blob. Clones share the same slot,
/// so a clone handed to a second store behaves like a process restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the slot with raw text, e.g. to simulate corrupt state.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(raw.into()))),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl HistoryBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Vec<Dataset>>, StorageError> {
        match self.raw() {
            Some(raw) => decode(&raw).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, datasets: &[Dataset]) -> Result<(), StorageError> {
        let serialized = encode(datasets)?;
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(serialized);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_backend_reports_missing_file_as_nothing_stored() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let backend = FileBackend::in_dir(dir.path());
        assert!(backend.load().expect("missing file is not an error").is_none());
        backend.clear().expect("clearing a missing file is a no-op");
    }

    #[test]
    fn file_backend_round_trips_and_clears() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let backend = FileBackend::new(dir.path().join("nested"), "history");
        let datasets = vec![Dataset::new("a.csv", Vec::new())];

        backend.save(&datasets).expect("save should succeed");
        assert!(backend.path().ends_with("nested/history.json"));
        assert_eq!(backend.load().expect("load should succeed"), Some(datasets));

        backend.clear().expect("clear should succeed");
        assert!(!backend.path().exists());
    }

    #[test]
    fn corrupt_blob_is_a_deserialize_error() {
        let backend = MemoryBackend::with_raw("{not json");
        assert!(matches!(backend.load(), Err(StorageError::Deserialize(_))));
    }
}
