//! Directive state machine
//!
//! Reads a host document line by line. Lines starting with the document's
//! comment marker may open a directive block; following comment lines extend
//! it (or set its options with `CONFIG`), and the first other line closes it.
//!
//! After a block closes, the output generated for it on the previous run sits
//! right below it. That region is dropped until the next blank line or comment
//! line so that regenerating a document is idempotent.
//!
//! # States
//! ```text
//!            open keyword              non-comment line
//!   None ─────────────────► Block(k) ──────────────────► Erase
//!    ▲                        │ (DEFINE closes to None)    │
//!    └────────────────────────┴──────── blank / comment ───┘
//! ```

use super::error::{DirectiveError, DirectiveResult};
use super::{BlockKind, DirectiveBlock, DocumentKind};
use crate::import::{split_key_value_line, ImportFormat};
use regex::Regex;
use std::sync::OnceLock;

/// Keyword of the in-block option line
const CONFIG_KEYWORD: &str = "CONFIG";

/// State between two lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Outside any directive
    None,
    /// Collecting the lines of an open block
    Block(BlockKind),
    /// Dropping output generated by a previous run
    Erase,
}

/// Side effect requested by one line
#[derive(Debug, Clone, PartialEq)]
pub enum Action<'a> {
    /// Copy the line to the regenerated document
    Echo(&'a str),
    /// A block is complete and must be evaluated
    Dispatch(DirectiveBlock),
    /// `UNDEF name`
    Undefine(String),
    /// `IMPORT-DATA table path` / `IMPORT-JSON-DATA table path`
    Import {
        format: ImportFormat,
        table: String,
        path: String,
    },
}

/// Result of feeding one line to [`step`]
#[derive(Debug, PartialEq)]
pub struct Transition<'a> {
    pub next: ScanState,
    pub actions: Vec<Action<'a>>,
}

/// The block being collected and the position in the document
#[derive(Debug, Default)]
pub struct Accumulator {
    block: Option<DirectiveBlock>,
    line: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1-based number of the line fed last
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn block(&self) -> Option<&DirectiveBlock> {
        self.block.as_ref()
    }
}

/// Compute the transition for one line (including its line terminator)
pub fn step<'a>(
    state: ScanState,
    acc: &mut Accumulator,
    document: DocumentKind,
    line: &'a str,
) -> DirectiveResult<Transition<'a>> {
    acc.line += 1;
    let marker = document.comment_marker();
    let mut actions = Vec::new();
    let mut state = state;

    if let ScanState::Block(kind) = state {
        if let Some(content) = line.strip_prefix(marker) {
            let content = content.trim_end();
            match strip_keyword(content.trim_start(), CONFIG_KEYWORD) {
                Some(options) => {
                    let pairs = split_key_value_line(options).map_err(|e| syntax(acc.line, e))?;
                    if let Some(block) = acc.block.as_mut() {
                        block.options.apply(&pairs)?;
                    }
                }
                None => {
                    if let Some(block) = acc.block.as_mut() {
                        block.push_fragment(content);
                    }
                }
            }
            actions.push(Action::Echo(line));
            return Ok(Transition {
                next: state,
                actions,
            });
        }

        if let Some(block) = acc.block.take() {
            actions.push(Action::Dispatch(block));
        }
        state = match kind {
            BlockKind::Define => ScanState::None,
            _ => ScanState::Erase,
        };
    }

    if state == ScanState::Erase {
        if !line.trim().is_empty() && !line.starts_with(marker) {
            return Ok(Transition {
                next: state,
                actions,
            });
        }
        state = ScanState::None;
    }

    if let Some(content) = line.strip_prefix(marker) {
        let content = content.trim();

        if let Some(kind) = BlockKind::ALL
            .iter()
            .copied()
            .find(|kind| strip_keyword(content, kind.keyword()).is_some())
        {
            acc.block = Some(DirectiveBlock::new(kind, content, acc.line));
            actions.push(Action::Echo(line));
            return Ok(Transition {
                next: ScanState::Block(kind),
                actions,
            });
        }

        if let Some(action) = single_line_directive(content, acc.line)? {
            actions.push(action);
        }
    }

    actions.push(Action::Echo(line));
    Ok(Transition {
        next: state,
        actions,
    })
}

/// Strip `keyword` if it is followed by a non-identifier character or the end
fn strip_keyword<'a>(content: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = content.strip_prefix(keyword)?;
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' || c == '-' => None,
        _ => Some(rest),
    }
}

fn syntax(line: usize, err: impl std::fmt::Display) -> DirectiveError {
    DirectiveError::Syntax {
        line,
        message: err.to_string(),
    }
}

fn undef_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^UNDEF\s+([A-Za-z_][A-Za-z0-9_]*)$").expect("valid regex"))
}

fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(IMPORT-DATA|IMPORT-JSON-DATA)\s+(\S+)\s+(.+)$").expect("valid regex")
    })
}

/// Recognize `UNDEF` and `IMPORT-*` lines (content is marker-stripped and trimmed)
fn single_line_directive<'a>(
    content: &str,
    line: usize,
) -> DirectiveResult<Option<Action<'a>>> {
    if strip_keyword(content, "UNDEF").is_some() {
        let caps = undef_regex()
            .captures(content)
            .ok_or_else(|| syntax(line, format!("malformed UNDEF: {}", content)))?;
        return Ok(Some(Action::Undefine(caps[1].to_string())));
    }

    let format = if strip_keyword(content, "IMPORT-DATA").is_some() {
        ImportFormat::ResultLog
    } else if strip_keyword(content, "IMPORT-JSON-DATA").is_some() {
        ImportFormat::Json
    } else {
        return Ok(None);
    };

    let caps = import_regex()
        .captures(content)
        .ok_or_else(|| syntax(line, format!("expected '<table> <path>': {}", content)))?;

    Ok(Some(Action::Import {
        format,
        table: caps[2].to_string(),
        path: caps[3].trim().to_string(),
    }))
}

/// Line-by-line driver around [`step`]
#[derive(Debug)]
pub struct Scanner {
    document: DocumentKind,
    state: ScanState,
    acc: Accumulator,
}

impl Scanner {
    pub fn new(document: DocumentKind) -> Self {
        Self {
            document,
            state: ScanState::None,
            acc: Accumulator::new(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Number of lines fed so far
    pub fn line(&self) -> usize {
        self.acc.line()
    }

    /// Feed the next line and return the actions it triggers
    pub fn feed<'a>(&mut self, line: &'a str) -> DirectiveResult<Vec<Action<'a>>> {
        let transition = step(self.state, &mut self.acc, self.document, line)?;
        self.state = transition.next;
        Ok(transition.actions)
    }

    /// End of input: return a block still open at the last line
    pub fn finish(&mut self) -> Option<DirectiveBlock> {
        self.state = ScanState::None;
        self.acc.block.take()
    }
}
