//! Data file parsing for data-driven runs
//!
//! CSV files are headers-plus-rows (first line = variable names); JSON
//! files are an array of objects, or a single object for a one-row run.
//! All values are coerced to text before they become iteration variables.

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::Path;

use crate::errors::{ReqforgeError, Result};

/// One iteration's worth of variables
pub type DataRow = HashMap<String, String>;

/// Load a data file, picking the format from the extension
/// (`.json` = JSON, anything else = CSV).
pub fn load_data_file(path: &Path) -> Result<Vec<DataRow>> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        parse_json(&content)
    } else {
        parse_csv(&content)
    }
}

/// Parse CSV content: first line is variable names, each remaining line
/// is one row. Surrounding quotes are stripped by the reader.
pub fn parse_csv(content: &str) -> Result<Vec<DataRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReqforgeError::Argument(format!("invalid CSV data file: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| ReqforgeError::Argument(format!("invalid CSV row: {}", e)))?;
        let mut row = DataRow::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            row.insert(header.clone(), value.to_string());
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Parse JSON content: an array of objects yields one row per object, a
/// single object yields one row.
pub fn parse_json(content: &str) -> Result<Vec<DataRow>> {
    let value: JsonValue = serde_json::from_str(content)?;

    let objects: Vec<&serde_json::Map<String, JsonValue>> = match &value {
        JsonValue::Array(items) => items.iter().filter_map(|v| v.as_object()).collect(),
        JsonValue::Object(obj) => vec![obj],
        _ => {
            return Err(ReqforgeError::Argument(
                "JSON data file must be an object or an array of objects".to_string(),
            ))
        }
    };

    Ok(objects
        .into_iter()
        .map(|obj| {
            obj.iter()
                .map(|(key, val)| (key.clone(), coerce_to_text(val)))
                .collect()
        })
        .collect())
}

fn coerce_to_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}
