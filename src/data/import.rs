//! CSV import flow: input-type gate, parsing into rows, and the sequence that
//! ties validation to the history store.
//!
//! Order of a single import:
//! 1. reject anything that is not CSV,
//! 2. parse rows (first record is the header),
//! 3. if the filename is already in history, ask before replacing,
//! 4. validate and always return the report,
//! 5. commit only when the report has no structural errors.

use std::fs;
use std::path::Path;

use crate::data::dataset::Dataset;
use crate::data::history::HistoryStore;
use crate::data::row::Row;
use crate::data::validate::{validate, ValidationReport};

pub const CSV_CONTENT_TYPE: &str = "text/csv";

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Please upload a CSV file (got '{filename}')")]
    NotCsv { filename: String },
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Error parsing CSV file: {0}")]
    Parse(#[from] csv::Error),
}

/// Accept declared `text/csv` content, or a `.csv` filename when no type is declared.
pub fn ensure_csv(filename: &str, content_type: Option<&str>) -> Result<(), ImportError> {
    let accepted = match content_type {
        Some(declared) => declared
            .split(';')
            .next()
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(CSV_CONTENT_TYPE)),
        None => Path::new(filename)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv")),
    };
    if accepted {
        Ok(())
    } else {
        Err(ImportError::NotCsv {
            filename: filename.to_string(),
        })
    }
}

/// Parse CSV text into rows keyed by the header record. Values stay strings.
/// Short records produce rows with only the columns they cover.
pub fn parse_csv(content: &str) -> Result<Vec<Row>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() > headers.len() {
            tracing::debug!(
                record = index + 1,
                extra = record.len() - headers.len(),
                "dropping fields beyond header width"
            );
        }
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, field)| (header.to_string(), field.into()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Read a CSV file from disk. Returns the file's base name alongside the rows.
pub fn read_csv_file(path: &str) -> Result<(String, Vec<Row>), ImportError> {
    let filename = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    ensure_csv(&filename, None)?;
    let content = fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_string(),
        source,
    })?;
    Ok((filename, parse_csv(&content)?))
}

/// User decisions the import flow cannot make on its own.
pub trait Confirm {
    fn confirm_replace(&mut self, filename: &str) -> bool;
    fn confirm_delete(&mut self, filename: &str) -> bool;
    fn confirm_clear(&mut self, entries: usize) -> bool;
}

impl<C: Confirm + ?Sized> Confirm for &mut C {
    fn confirm_replace(&mut self, filename: &str) -> bool {
        (**self).confirm_replace(filename)
    }

    fn confirm_delete(&mut self, filename: &str) -> bool {
        (**self).confirm_delete(filename)
    }

    fn confirm_clear(&mut self, entries: usize) -> bool {
        (**self).confirm_clear(entries)
    }
}

/// Fixed answer for every question, e.g. `--yes` on the command line or an
/// explicit `replace=true` on an HTTP request.
#[derive(Debug, Clone, Copy)]
pub struct Preapproved(pub bool);

impl Confirm for Preapproved {
    fn confirm_replace(&mut self, _filename: &str) -> bool {
        self.0
    }

    fn confirm_delete(&mut self, _filename: &str) -> bool {
        self.0
    }

    fn confirm_clear(&mut self, _entries: usize) -> bool {
        self.0
    }
}

#[derive(Debug)]
pub enum ImportOutcome {
    /// Filename already in history and the replacement was refused. Nothing ran.
    Declined { filename: String },
    /// Structural errors; nothing was committed.
    Rejected { report: ValidationReport },
    Committed {
        dataset: Dataset,
        report: ValidationReport,
        replaced: bool,
        persist_warning: Option<String>,
    },
}

impl ImportOutcome {
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Declined { .. } => None,
            Self::Rejected { report } | Self::Committed { report, .. } => Some(report),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    NotFound,
    Declined,
    Deleted {
        filename: String,
        persist_warning: Option<String>,
    },
}

pub struct Importer<'a, C: Confirm> {
    store: &'a mut HistoryStore,
    confirm: C,
}

impl<'a, C: Confirm> Importer<'a, C> {
    pub fn new(store: &'a mut HistoryStore, confirm: C) -> Self {
        Self { store, confirm }
    }

    /// Run the full import for CSV text uploaded under `filename`.
    pub fn import(
        &mut self,
        filename: &str,
        content_type: Option<&str>,
        content: &str,
    ) -> Result<ImportOutcome, ImportError> {
        ensure_csv(filename, content_type)?;
        let rows = parse_csv(content)?;
        Ok(self.import_rows(filename, rows))
    }

    /// Steps 3-5 for rows that are already parsed.
    pub fn import_rows(&mut self, filename: &str, rows: Vec<Row>) -> ImportOutcome {
        let replaced = self.store.is_duplicate(filename);
        if replaced && !self.confirm.confirm_replace(filename) {
            tracing::info!(filename, "replacement declined");
            return ImportOutcome::Declined {
                filename: filename.to_string(),
            };
        }

        let report = validate(&rows);
        if !report.is_valid {
            tracing::info!(filename, errors = report.errors.len(), "import rejected");
            return ImportOutcome::Rejected { report };
        }

        let committed = self.store.add_usage_data(rows, filename);
        let persist_warning = committed.warning_message();
        ImportOutcome::Committed {
            dataset: committed.into_value(),
            report,
            replaced,
            persist_warning,
        }
    }

    pub fn delete(&mut self, id: &str) -> DeleteOutcome {
        let Some(filename) = self.store.get(id).map(|dataset| dataset.filename.clone()) else {
            return DeleteOutcome::NotFound;
        };
        if !self.confirm.confirm_delete(&filename) {
            return DeleteOutcome::Declined;
        }
        let deleted = self.store.delete_entry(id);
        DeleteOutcome::Deleted {
            filename,
            persist_warning: deleted.warning_message(),
        }
    }

    /// Returns `None` when the user declined, otherwise the persist warning if any.
    pub fn clear(&mut self) -> Option<Option<String>> {
        if !self.confirm.confirm_clear(self.store.len()) {
            return None;
        }
        Some(self.store.clear_history().warning_message())
    }
}
