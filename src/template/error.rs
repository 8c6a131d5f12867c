//! Query templating error types

use crate::engine::EngineError;
use thiserror::Error;

/// Errors raised while expanding and running plot queries
#[derive(Error, Debug)]
pub enum TemplateError {
    /// A MULTIPLOT query does not contain the placeholder
    #[error("No {placeholder} placeholder in query: {query}")]
    MissingPlaceholder { placeholder: String, query: String },

    /// A grouping column is NULL in some row
    #[error("Grouping column '{column}' is NULL in result of: {query}")]
    NullGroupValue { column: String, query: String },

    /// An x/y value cannot be read as a number
    #[error("Values of {group} are not numbers or not defined. Query: {query}")]
    NotNumeric { group: String, query: String },

    /// The query engine failed
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result type for templating operations
pub type TemplateResult<T> = Result<T, TemplateError>;
