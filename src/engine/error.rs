//! Query engine error types

use thiserror::Error;

/// Errors reported by the relational query engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// The database could not be opened or configured
    #[error("Cannot open database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The engine rejected a query
    #[error("Query failed: {source}\n  query: {query}")]
    Query {
        query: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A row lacks a column the caller requires
    #[error("Column '{column}' missing from result of: {query}")]
    MissingColumn { column: String, query: String },
}

impl EngineError {
    /// The query text that failed, if any
    pub fn query(&self) -> Option<&str> {
        match self {
            EngineError::Query { query, .. } | EngineError::MissingColumn { query, .. } => {
                Some(query)
            }
            EngineError::Open { .. } => None,
        }
    }
}

/// Result type for query engine operations
pub type EngineResult<T> = Result<T, EngineError>;
