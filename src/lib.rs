//! # sqlplot
//!
//! Directive-driven document preprocessor. Benchmark results are imported
//! into SQL tables and queried from comment blocks embedded in LaTeX,
//! Python, JavaScript, CSV or gnuplot files; the results are written back
//! into the document (or into side files) as pgfplots commands, tables or
//! plain data.
//!
//! ## Modules
//!
//! - [`directive`]: directive scanner, block options and macros
//! - [`template`]: MULTIPLOT / SINGLEPLOT query rewriting
//! - [`render`]: output encodings and the color cache
//! - [`import`]: RESULT log / JSON import and schema inference
//! - [`engine`]: the SQL engine seam and its SQLite implementation
//! - [`processor`]: a whole document pass
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sqlplot::{process_file, ProcessOptions, SqliteEngine};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = SqliteEngine::in_memory()?;
//!     let options = ProcessOptions {
//!         kind: None,
//!         color_cache: Some("pgf_color_entries.txt".into()),
//!     };
//!
//!     let document = process_file(Path::new("paper/plots.tex"), &mut engine, &options)?;
//!     print!("{}", document);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod directive;
pub mod engine;
pub mod error;
pub mod import;
pub mod processor;
pub mod render;
pub mod template;

pub use config::{Config, ConfigError};
pub use directive::{BlockKind, DirectiveBlock, DirectiveError, DocumentKind, MacroTable};
pub use engine::{EngineError, QueryEngine, SqlValue, SqliteEngine};
pub use error::{SqlPlotError, SqlPlotResult};
pub use import::{import_file, ImportError, ImportFormat};
pub use processor::{process_file, write_document, ProcessOptions, Processor};
pub use render::{ColorCache, OutputKind, RenderError, Renderer};
pub use template::{CoordinateMap, GroupKey, TemplateError};
