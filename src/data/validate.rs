use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::row::{self, Row};

/// Substrings that mark a column as numeric when found in its lowercased name.
const NUMERIC_COLUMN_HINTS: &[&str] = &["amount", "price", "quantity", "age"];

/// Outcome of validating one dataset. Errors block a commit, warnings never do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl ValidationReport {
    pub fn error(&mut self, message: impl Into<String>) {
        self.is_valid = false;
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn is_clean(&self) -> bool {
        self.is_valid && self.warnings.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "CSV file is valid");
        }

        let mut lines: Vec<String> = Vec::new();
        if !self.is_valid {
            lines.push("Critical Issues:".to_string());
            lines.extend(self.errors.iter().map(|error| format!("- {error}")));
        }
        if !self.warnings.is_empty() {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push("Potential Issues:".to_string());
            lines.extend(self.warnings.iter().map(|warning| format!("- {warning}")));
        }
        write!(f, "{}", lines.join("\n"))
    }
}

/// Validate parsed rows. Pure: the same rows always produce the same report.
pub fn validate(rows: &[Row]) -> ValidationReport {
    let mut report = ValidationReport::default();

    if rows.is_empty() {
        report.error("No data found in CSV file");
        return report;
    }

    let headers = row::headers(rows);
    if headers.is_empty() {
        report.error("No headers found");
        return report;
    }

    let numeric_headers: Vec<&str> = headers
        .iter()
        .copied()
        .filter(|header| is_numeric_column(header))
        .collect();

    for (index, row) in rows.iter().enumerate() {
        let line = index + 1;
        if row.is_empty() {
            report.error(format!("Row {line}: No valid data found"));
            continue;
        }

        for header in &numeric_headers {
            let Some(value) = row.get(*header) else {
                continue;
            };
            if row::is_present(value) && !row::is_finite_number(value) {
                report.warning(format!(
                    "Row {line}: Invalid numeric value in column \"{header}\": {}",
                    row::display_cell(value)
                ));
            }
        }
    }

    let distinct: HashSet<String> = rows.iter().map(row::canonical_key).collect();
    if distinct.len() < rows.len() {
        report.warning(format!(
            "Found {} potential duplicate rows",
            rows.len() - distinct.len()
        ));
    }

    tracing::debug!(
        rows = rows.len(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validated dataset"
    );
    report
}

fn is_numeric_column(header: &str) -> bool {
    let lower = header.to_lowercase();
    NUMERIC_COLUMN_HINTS.iter().any(|hint| lower.contains(hint))
}
