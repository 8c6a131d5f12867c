//! Render error types

use crate::engine::EngineError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while rendering directive results
#[derive(Error, Debug)]
pub enum RenderError {
    /// An output or cache file could not be read or written
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A script-data file was requested in write mode after this run opened it
    #[error("Output file {0:?} was already written by an earlier directive; use mode=append")]
    ScriptOverwrite(PathBuf),

    /// Script data cannot be inlined into the document
    #[error("Output type gnuplot needs a file= option")]
    InlineScriptData,

    /// A MATRIX cell has no value
    #[error("MATRIX has no value for x={x}, y={y}. Query: {query}")]
    MissingCell { x: String, y: String, query: String },

    /// A color cache line cannot be decoded
    #[error("Invalid color cache entry in {path:?} line {line}: {message}")]
    CacheFormat {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// JSON encoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The query engine failed
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;
