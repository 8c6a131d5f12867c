//! Directives embedded in host documents
//!
//! A directive is a run of comment lines in a document, starting with a
//! keyword right after the document's comment marker:
//!
//! ```text
//! %% IMPORT-DATA low eval/low.txt
//! %% MULTIPLOT(algo) SELECT time AS x, mem AS y, MULTIPLOT FROM low
//! %% WHERE action = 'compression' GROUP BY MULTIPLOT, x
//! %% CONFIG file=plots/low.tex
//! ```
//!
//! - [`scanner`]: the line-by-line state machine
//! - [`MacroTable`]: `DEFINE` / `UNDEF` and `$name(...)` expansion
//! - [`BlockOptions`]: options set by `CONFIG` lines

mod error;
pub mod header;
mod macros;
mod options;
pub mod scanner;

pub use error::{DirectiveError, DirectiveResult};
pub use macros::{Macro, MacroTable};
pub use options::{BlockOptions, OutputMode};
pub use scanner::{Action, ScanState, Scanner};

use crate::render::OutputKind;
use std::path::Path;

/// Kind of host document, selecting the comment marker of directive lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// LaTeX / pgfplots source (`.tex`)
    Typesetting,
    /// Python (`.py`)
    Scripting,
    /// JavaScript (`.js`)
    WebScripting,
    /// CSV data (`.csv`)
    TabularData,
    /// gnuplot script (`.gp`, `.gnuplot`, `.plt`)
    PlottingScript,
}

impl DocumentKind {
    /// Detect the kind from a file extension
    pub fn from_path(path: &Path) -> DirectiveResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "tex" => Ok(DocumentKind::Typesetting),
            "py" => Ok(DocumentKind::Scripting),
            "js" => Ok(DocumentKind::WebScripting),
            "csv" => Ok(DocumentKind::TabularData),
            "gp" | "gnuplot" | "plt" => Ok(DocumentKind::PlottingScript),
            _ => Err(DirectiveError::UnknownDocumentKind(path.display().to_string())),
        }
    }

    /// Parse a kind name as given on the command line
    pub fn from_name(name: &str) -> DirectiveResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "tex" | "latex" => Ok(DocumentKind::Typesetting),
            "py" | "python" => Ok(DocumentKind::Scripting),
            "js" | "javascript" => Ok(DocumentKind::WebScripting),
            "csv" => Ok(DocumentKind::TabularData),
            "gp" | "gnuplot" => Ok(DocumentKind::PlottingScript),
            other => Err(DirectiveError::UnknownDocumentKind(other.to_string())),
        }
    }

    /// Prefix that marks a directive line
    pub fn comment_marker(&self) -> &'static str {
        match self {
            DocumentKind::Typesetting => "%%",
            DocumentKind::WebScripting => "///",
            DocumentKind::Scripting | DocumentKind::TabularData | DocumentKind::PlottingScript => {
                "##"
            }
        }
    }

    /// Output encoding used when a block sets no `type`
    pub fn default_output(&self) -> OutputKind {
        match self {
            DocumentKind::Typesetting => OutputKind::Typesetting,
            DocumentKind::Scripting => OutputKind::StructuredLiteral,
            DocumentKind::WebScripting => OutputKind::ObjectNotation,
            DocumentKind::TabularData => OutputKind::TabularText,
            DocumentKind::PlottingScript => OutputKind::ScriptData,
        }
    }

    /// Only typesetting documents persist the color cache
    pub fn persists_color_cache(&self) -> bool {
        matches!(self, DocumentKind::Typesetting)
    }
}

/// Kind of a multi-line directive block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Multiplot,
    Singleplot,
    Tabular,
    Matrix,
    Define,
}

impl BlockKind {
    /// Block kinds in matching order
    pub const ALL: [BlockKind; 5] = [
        BlockKind::Multiplot,
        BlockKind::Singleplot,
        BlockKind::Tabular,
        BlockKind::Matrix,
        BlockKind::Define,
    ];

    /// Keyword that opens the block
    pub fn keyword(&self) -> &'static str {
        match self {
            BlockKind::Multiplot => "MULTIPLOT",
            BlockKind::Singleplot => "SINGLEPLOT",
            BlockKind::Tabular => "TABULAR",
            BlockKind::Matrix => "MATRIX",
            BlockKind::Define => "DEFINE",
        }
    }
}

/// A directive block collected from consecutive comment lines
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveBlock {
    pub kind: BlockKind,
    /// Marker-stripped line contents, in document order
    pub fragments: Vec<String>,
    pub options: BlockOptions,
    /// Line number of the opening line
    pub line: usize,
}

impl DirectiveBlock {
    pub fn new(kind: BlockKind, first: &str, line: usize) -> Self {
        Self {
            kind,
            fragments: vec![first.trim().to_string()],
            options: BlockOptions::default(),
            line,
        }
    }

    /// Append a continuation line's content
    pub fn push_fragment(&mut self, fragment: &str) {
        let fragment = fragment.trim();
        if !fragment.is_empty() {
            self.fragments.push(fragment.to_string());
        }
    }

    /// The whole block text, fragments joined with single spaces
    pub fn body(&self) -> String {
        self.fragments.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_path() {
        assert_eq!(
            DocumentKind::from_path(Path::new("paper/plots.tex")).unwrap(),
            DocumentKind::Typesetting
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("plot.GP")).unwrap(),
            DocumentKind::PlottingScript
        );
        assert!(matches!(
            DocumentKind::from_path(Path::new("notes.md")),
            Err(DirectiveError::UnknownDocumentKind(_))
        ));
        assert!(DocumentKind::from_path(Path::new("Makefile")).is_err());
    }

    #[test]
    fn test_markers_and_defaults() {
        assert_eq!(DocumentKind::Typesetting.comment_marker(), "%%");
        assert_eq!(DocumentKind::WebScripting.comment_marker(), "///");
        assert_eq!(DocumentKind::TabularData.comment_marker(), "##");
        assert_eq!(
            DocumentKind::TabularData.default_output(),
            OutputKind::TabularText
        );
        assert!(DocumentKind::Typesetting.persists_color_cache());
        assert!(!DocumentKind::Scripting.persists_color_cache());
    }

    #[test]
    fn test_block_body_joins_fragments() {
        let mut block = DirectiveBlock::new(BlockKind::Tabular, " TABULAR SELECT a ", 3);
        block.push_fragment("  FROM t");
        block.push_fragment("   ");
        block.push_fragment("WHERE a > 1");
        assert_eq!(block.body(), "TABULAR SELECT a FROM t WHERE a > 1");
    }
}
