//! JSON array reader
//!
//! Accepts a JSON array of flat objects, one object per row:
//!
//! ```text
//! [{"algo": "lz78", "time": 10}, {"algo": "lzw", "time": 12, "mem": null}]
//! ```

use super::error::{ImportError, ImportResult};
use super::Record;
use serde_json::Value;
use std::path::Path;

/// Read all records from a JSON file
pub fn read_json_records(path: &Path) -> ImportResult<Vec<Record>> {
    let content = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_json_records(&content).map_err(|reason| ImportError::InvalidJson {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parse records from JSON text; the error is a human-readable reason
pub fn parse_json_records(content: &str) -> Result<Vec<Record>, String> {
    let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;

    let Value::Array(items) = value else {
        return Err("top-level value is not an array".to_string());
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(fields) => fields
                .into_iter()
                .map(|(key, value)| {
                    let text = scalar_text(&key, idx, value)?;
                    Ok((key, text))
                })
                .collect::<Result<Record, String>>(),
            other => Err(format!("element {} is not an object: {}", idx, other)),
        })
        .collect()
}

fn scalar_text(key: &str, idx: usize, value: Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(format!(
            "element {} field '{}' is not a scalar value",
            idx, key
        )),
    }
}
