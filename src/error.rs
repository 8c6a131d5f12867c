//! Crate-level error type

use crate::config::ConfigError;
use crate::directive::DirectiveError;
use crate::engine::EngineError;
use crate::import::ImportError;
use crate::render::RenderError;
use crate::template::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

/// Any error that aborts a document pass
#[derive(Error, Debug)]
pub enum SqlPlotError {
    #[error(transparent)]
    Directive(#[from] DirectiveError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The document itself could not be read or written
    #[error("I/O error on {path:?}: {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directive failed; `line` is where it starts in the document
    #[error("Directive on line {line} failed: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<SqlPlotError>,
    },
}

impl SqlPlotError {
    /// Attach the document line of the failing directive
    pub fn at_line(self, line: usize) -> Self {
        match self {
            SqlPlotError::AtLine { .. } => self,
            other => SqlPlotError::AtLine {
                line,
                source: Box::new(other),
            },
        }
    }
}

/// Result type for document passes
pub type SqlPlotResult<T> = Result<T, SqlPlotError>;
