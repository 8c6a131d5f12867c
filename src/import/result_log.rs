//! RESULT log reader
//!
//! Benchmark programs print one `RESULT key=value ...` line per measurement;
//! every other line of the log is ignored.

use super::error::{ImportError, ImportResult};
use super::keyvalue::split_result_line;
use super::Record;
use std::path::Path;

/// Read all RESULT records from a log file
pub fn read_result_log(path: &Path) -> ImportResult<Vec<Record>> {
    let content = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_result_log(&content)
}

/// Parse RESULT records from log text
pub fn parse_result_log(content: &str) -> ImportResult<Vec<Record>> {
    let mut records = Vec::new();

    for line in content.lines() {
        if let Some(attrs) = split_result_line(line) {
            let attrs = attrs?;
            if attrs.is_empty() {
                continue;
            }
            records.push(attrs.into_iter().map(|(k, v)| (k, Some(v))).collect());
        }
    }

    Ok(records)
}
