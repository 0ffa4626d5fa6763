//! Row model: an ordered column -> scalar mapping with no fixed schema.
//! Column order survives persistence because serde_json is built with `preserve_order`.

use serde_json::{Map, Value};

/// One record of a dataset. Keys are column names taken from the header row.
pub type Row = Map<String, Value>;

/// Header set of a dataset, taken from the first row's keys.
pub fn headers(rows: &[Row]) -> Vec<&str> {
    rows.first()
        .map(|row| row.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Stable serialization of a row: keys sorted, so two rows holding the same
/// cells in a different key order produce the same string.
pub fn canonical_key(row: &Row) -> String {
    let mut keys: Vec<&String> = row.keys().collect();
    keys.sort();
    let mut sorted = Map::with_capacity(row.len());
    for key in keys {
        if let Some(value) = row.get(key) {
            sorted.insert(key.clone(), value.clone());
        }
    }
    Value::Object(sorted).to_string()
}

/// True when the cell carries something to check: not null and not an empty string.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        _ => true,
    }
}

/// Numeric reading of a cell with the usual loose text-to-number rules:
/// surrounding whitespace ignored, blank text is zero, `0x`/`0o`/`0b` integer
/// prefixes allowed. Returns `None` when the text is not a number at all.
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::String(text) => parse_number(text),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// True when the cell converts to a finite number.
pub fn is_finite_number(value: &Value) -> bool {
    to_number(value).is_some_and(f64::is_finite)
}

fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    let lower = trimmed.to_ascii_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lower.strip_prefix(prefix) {
            return parse_radix(digits, radix);
        }
    }
    // Rust also accepts "inf"/"nan" spellings; they fail the finiteness check downstream.
    trimmed.parse::<f64>().ok()
}

fn parse_radix(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0.0_f64, |acc, ch| {
        ch.to_digit(radix)
            .map(|digit| acc * f64::from(radix) + f64::from(digit))
    })
}

/// Render a cell the way it appears in report messages.
pub fn display_cell(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(value: Value) -> Row {
        value.as_object().cloned().expect("fixture should be an object")
    }

    #[test]
    fn canonical_key_ignores_key_order() {
        let a = row(json!({"name": "x", "price": "1"}));
        let b = row(json!({"price": "1", "name": "x"}));
        assert_eq!(canonical_key(&a), canonical_key(&b));
    }

    #[test]
    fn canonical_key_distinguishes_absent_keys() {
        let full = row(json!({"name": "x", "price": ""}));
        let partial = row(json!({"name": "x"}));
        assert_ne!(canonical_key(&full), canonical_key(&partial));
    }

    #[test]
    fn numeric_parsing_follows_loose_rules() {
        assert!(is_finite_number(&json!(" 12.5 ")));
        assert!(is_finite_number(&json!("1e3")));
        assert!(is_finite_number(&json!("-.5")));
        assert!(is_finite_number(&json!("0x1F")));
        assert!(is_finite_number(&json!("   ")));
        assert!(is_finite_number(&json!(42)));
        assert!(!is_finite_number(&json!("abc")));
        assert!(!is_finite_number(&json!("12abc")));
        assert!(!is_finite_number(&json!("Infinity")));
        assert!(!is_finite_number(&json!("NaN")));
        assert!(!is_finite_number(&json!("1e400")));
        assert!(!is_finite_number(&json!("0x")));
        assert!(!is_finite_number(&json!("1,000")));
    }

    #[test]
    fn presence_skips_null_and_empty_text() {
        assert!(!is_present(&Value::Null));
        assert!(!is_present(&json!("")));
        assert!(is_present(&json!(" ")));
        assert!(is_present(&json!(0)));
    }

    #[test]
    fn headers_come_from_first_row_in_order() {
        let rows = vec![row(json!({"b": "1", "a": "2"})), row(json!({"c": "3"}))];
        assert_eq!(headers(&rows), vec!["b", "a"]);
        assert!(headers(&[]).is_empty());
    }
}
