//! Import history: the deduplicated, persisted collection of committed datasets.
//!
//! Filenames are unique within the collection. Committing a filename that is
//! already present replaces that entry in place, keeping its list position,
//! with a brand-new id and timestamp. Every mutation writes the whole
//! collection through the backend before returning; a failed write is handed
//! back as a warning and the in-memory state stays authoritative.

use crate::data::dataset::Dataset;
use crate::data::row::Row;
use crate::data::storage::{HistoryBackend, StorageError};

/// Result of a mutation: the value plus any failure to make it durable.
#[must_use]
#[derive(Debug)]
pub struct Persisted<T> {
    pub value: T,
    pub warning: Option<StorageError>,
}

impl<T> Persisted<T> {
    pub fn is_durable(&self) -> bool {
        self.warning.is_none()
    }

    /// Human-readable form of the write failure, if any.
    pub fn warning_message(&self) -> Option<String> {
        self.warning
            .as_ref()
            .map(|err| format!("change may not survive a restart: {err}"))
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

pub struct HistoryStore {
    backend: Box<dyn HistoryBackend>,
    datasets: Vec<Dataset>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("datasets", &self.datasets.len())
            .finish_non_exhaustive()
    }
}

impl HistoryStore {
    /// Open the store, loading whatever the backend holds. Missing or unreadable
    /// state starts an empty history.
    pub fn open(backend: impl HistoryBackend + 'static) -> Self {
        let mut store = Self {
            backend: Box::new(backend),
            datasets: Vec::new(),
        };
        store.refresh();
        store
    }

    /// Re-read persisted state, picking up writes made by another process.
    /// A read failure keeps the current in-memory collection.
    pub fn refresh(&mut self) {
        match self.backend.load() {
            Ok(Some(datasets)) => self.datasets = datasets,
            Ok(None) => self.datasets.clear(),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable history state");
            }
        }
    }

    /// Committed datasets in insertion order.
    pub fn usage_history(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|dataset| dataset.id == id)
    }

    pub fn find_by_filename(&self, filename: &str) -> Option<&Dataset> {
        self.datasets
            .iter()
            .find(|dataset| dataset.filename == filename)
    }

    pub fn is_duplicate(&self, filename: &str) -> bool {
        self.find_by_filename(filename).is_some()
    }

    /// Commit rows under `filename`: replace the entry with that filename if one
    /// exists, otherwise append.
    pub fn add_usage_data(&mut self, rows: Vec<Row>, filename: &str) -> Persisted<Dataset> {
        let dataset = Dataset::new(filename, rows);
        let existing = self
            .datasets
            .iter()
            .position(|entry| entry.filename == filename);

        match existing {
            Some(slot) => {
                let previous = std::mem::replace(&mut self.datasets[slot], dataset.clone());
                tracing::info!(
                    filename,
                    id = %dataset.id,
                    replaced_id = %previous.id,
                    rows = dataset.rows.len(),
                    "replaced dataset"
                );
            }
            None => {
                self.datasets.push(dataset.clone());
                tracing::info!(filename, id = %dataset.id, rows = dataset.rows.len(), "added dataset");
            }
        }

        Persisted {
            value: dataset,
            warning: self.persist(),
        }
    }

    /// Remove the dataset with `id`. Unknown ids are a no-op; the value reports
    /// whether anything was removed.
    pub fn delete_entry(&mut self, id: &str) -> Persisted<bool> {
        let before = self.datasets.len();
        self.datasets.retain(|dataset| dataset.id != id);
        let removed = self.datasets.len() != before;
        if removed {
            tracing::info!(id, "deleted dataset");
        }

        Persisted {
            value: removed,
            warning: self.persist(),
        }
    }

    /// Empty the collection and drop the persisted state.
    pub fn clear_history(&mut self) -> Persisted<()> {
        let dropped = self.datasets.len();
        self.datasets.clear();
        tracing::info!(dropped, "cleared history");

        let warning = self.backend.clear().err();
        if let Some(err) = &warning {
            tracing::warn!(error = %err, "failed to clear persisted history");
        }
        Persisted { value: (), warning }
    }

    fn persist(&self) -> Option<StorageError> {
        let err = self.backend.save(&self.datasets).err()?;
        tracing::warn!(error = %err, "failed to persist history");
        Some(err)
    }
}
