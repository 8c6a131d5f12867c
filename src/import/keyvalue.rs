//! Key-Value Line Reader
//!
//! Splits a line of whitespace-separated `key=value` tokens into an ordered
//! list of pairs. Used for `CONFIG` lines in directive blocks and for the
//! attribute part of `RESULT` log lines.
//!
//! # Example
//! ```text
//! RESULT algo=lz78 time=10 mem=5
//! -> [("algo", "lz78"), ("time", "10"), ("mem", "5")]
//! ```

use super::error::{ImportError, ImportResult};

/// Prefix marking a benchmark result line in a log file
pub const RESULT_PREFIX: &str = "RESULT ";

/// Ordered `key=value` pairs; a repeated key keeps its first position and takes the last value
pub type KeyValues = Vec<(String, String)>;

/// Parse a line of `key=value` pairs separated by whitespace
///
/// The value is the maximal run of non-whitespace characters after `=`.
/// Text without any `=` after the last pair is ignored.
pub fn split_key_value_line(line: &str) -> ImportResult<KeyValues> {
    let mut pairs: KeyValues = Vec::new();
    let mut rest = line;

    while let Some(eq) = rest.find('=') {
        let key = rest[..eq].trim();
        let after = &rest[eq + 1..];
        let value_len = after
            .find(char::is_whitespace)
            .unwrap_or(after.len());

        if value_len == 0 || key.is_empty() {
            return Err(ImportError::InvalidKeyValue(line.trim().to_string()));
        }

        let value = &after[..value_len];
        match pairs.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value.to_string(),
            None => pairs.push((key.to_string(), value.to_string())),
        }

        rest = &after[value_len..];
    }

    Ok(pairs)
}

/// Parse a `RESULT key=value ...` line; returns `None` for any other line
pub fn split_result_line(line: &str) -> Option<ImportResult<KeyValues>> {
    line.strip_prefix(RESULT_PREFIX)
        .map(|attrs| split_key_value_line(attrs.trim()))
}
