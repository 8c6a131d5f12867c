//! Import error types
//!
//! Errors raised while reading benchmark logs and loading them into tables.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while importing data
#[derive(Error, Debug)]
pub enum ImportError {
    /// The data file could not be read
    #[error("Cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `key=value` line is malformed
    #[error("Invalid key/value line: {0}")]
    InvalidKeyValue(String),

    /// The JSON document is not an array of flat objects
    #[error("Invalid JSON data in {path:?}: {reason}")]
    InvalidJson { path: PathBuf, reason: String },

    /// Nothing usable was found in the data file
    #[error("No rows found in {0:?}")]
    NoRows(PathBuf),

    /// The records carry no fields, so no table can be created
    #[error("No columns to create table {0}")]
    NoColumns(String),

    /// A CSV delimiter argument is not a single byte
    #[error("Invalid delimiter: {0}")]
    InvalidDelimiter(String),

    /// Converted output could not be written
    #[error("Write error: {0}")]
    Output(#[source] std::io::Error),

    /// CSV conversion failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The query engine rejected the table or its rows
    #[error("Engine error: {0}")]
    Engine(#[from] crate::engine::EngineError),
}

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;
