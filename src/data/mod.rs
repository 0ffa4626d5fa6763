pub mod dataset;
pub mod history;
pub mod import;
pub mod row;
pub mod storage;
pub mod validate;

pub use dataset::{Dataset, DatasetSummary};
pub use history::{HistoryStore, Persisted};
pub use row::Row;
pub use storage::{FileBackend, HistoryBackend, MemoryBackend, StorageError};
pub use validate::{validate, ValidationReport};
