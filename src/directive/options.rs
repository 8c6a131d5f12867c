//! Block options set by `CONFIG key=value ...` lines

use super::error::{DirectiveError, DirectiveResult};
use crate::import::KeyValues;
use crate::render::OutputKind;
use std::path::PathBuf;

/// How an output file is opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Replace the file's content
    #[default]
    Write,
    /// Add after what earlier directives of this run wrote
    Append,
}

/// Options of one directive block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockOptions {
    /// Output file; `None` inlines the output into the document
    pub file: Option<PathBuf>,
    /// Output encoding; `None` uses the document kind's default
    pub output: Option<OutputKind>,
    pub mode: OutputMode,
    /// Use the persisted color cache for legend styles
    pub color_cache: bool,
}

impl Default for BlockOptions {
    fn default() -> Self {
        Self {
            file: None,
            output: None,
            mode: OutputMode::Write,
            color_cache: true,
        }
    }
}

impl BlockOptions {
    /// Apply the pairs of one CONFIG line on top of the current options
    pub fn apply(&mut self, pairs: &KeyValues) -> DirectiveResult<()> {
        for (key, value) in pairs {
            let invalid = || DirectiveError::InvalidOption {
                key: key.clone(),
                value: value.clone(),
            };

            match key.as_str() {
                "file" => self.file = Some(PathBuf::from(value)),
                "type" => self.output = Some(OutputKind::from_name(value).ok_or_else(invalid)?),
                "mode" => {
                    self.mode = match value.as_str() {
                        "write" | "w" => OutputMode::Write,
                        "append" | "a" => OutputMode::Append,
                        _ => return Err(invalid()),
                    }
                }
                "colorcache" => self.color_cache = parse_flag(value).ok_or_else(invalid)?,
                _ => return Err(DirectiveError::UnknownOption(key.clone())),
            }
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}
