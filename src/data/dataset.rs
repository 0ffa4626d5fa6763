//! Committed dataset: one named, timestamped snapshot of imported rows.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::row::Row;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    #[serde(rename = "data", alias = "rows", default)]
    pub rows: Vec<Row>,
}

impl Dataset {
    /// Build a fresh snapshot with a new id and the current instant.
    pub fn new(filename: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            filename: filename.into(),
            rows,
        }
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            id: self.id.clone(),
            filename: self.filename.clone(),
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            row_count: self.rows.len(),
        }
    }
}

/// Listing view of a dataset without its rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    pub filename: String,
    pub timestamp: String,
    pub row_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_datasets_never_share_ids() {
        let first = Dataset::new("a.csv", Vec::new());
        let second = Dataset::new("a.csv", Vec::new());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn persisted_shape_uses_data_field() {
        let dataset = Dataset::new("sales.csv", Vec::new());
        let json = serde_json::to_value(&dataset).expect("dataset should serialize");
        assert!(json.get("data").is_some());
        assert!(json["timestamp"].as_str().is_some_and(|ts| ts.ends_with('Z')));

        let summary = dataset.summary();
        assert_eq!(summary.filename, "sales.csv");
        assert_eq!(summary.row_count, 0);
    }
}
